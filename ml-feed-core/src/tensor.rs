//! Dense tensor values carried through pipelines

use bytemuck::Pod;

use crate::error::{Error, Result};

/// Trait for types that can be used as tensor elements
pub trait Element: Pod + Send + Sync + 'static {}

impl<T: Pod + Send + Sync + 'static> Element for T {}

/// A dense, row-major multidimensional tensor
///
/// The canonical per-example payload produced by decode stages. The
/// element buffer is owned; strides are expressed in elements.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor<T: Element> {
    /// Element data in row-major order
    data: Vec<T>,

    /// Shape of the tensor (dimensions)
    shape: Vec<usize>,

    /// Strides of the tensor (elements to skip per dimension)
    strides: Vec<usize>,
}

impl<T: Element> DenseTensor<T> {
    /// Create a zero-filled tensor with the given shape
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        let strides = Self::compute_strides(&shape);
        Self {
            data: vec![T::zeroed(); size],
            shape,
            strides,
        }
    }

    /// Create a tensor from a vector of elements
    pub fn from_vec(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::ShapeMismatch(format!(
                "data length {} does not match shape product {}",
                data.len(),
                expected
            )));
        }

        let strides = Self::compute_strides(&shape);
        Ok(Self {
            data,
            shape,
            strides,
        })
    }

    /// Create a tensor by reinterpreting raw bytes as elements
    pub fn from_bytes(bytes: &[u8], shape: Vec<usize>) -> Result<Self> {
        let elements: &[T] = bytemuck::try_cast_slice(bytes).map_err(|e| {
            Error::InvalidArgument(format!("byte buffer is not a valid element slice: {}", e))
        })?;
        Self::from_vec(elements.to_vec(), shape)
    }

    /// Get the shape of this tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides of this tensor, in elements
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// View the elements as a flat slice in row-major order
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// View the elements as a mutable flat slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// View the element buffer as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Get the element at the given multidimensional index
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() {
            return None;
        }
        if index.iter().zip(&self.shape).any(|(i, dim)| i >= dim) {
            return None;
        }

        let offset: usize = index.iter().zip(&self.strides).map(|(i, s)| i * s).sum();
        self.data.get(offset)
    }

    /// Reinterpret this tensor with a new shape of the same element count
    pub fn reshape(mut self, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != self.data.len() {
            return Err(Error::ShapeMismatch(format!(
                "cannot reshape {} elements into shape product {}",
                self.data.len(),
                expected
            )));
        }

        self.strides = Self::compute_strides(&shape);
        self.shape = shape;
        Ok(self)
    }

    /// Consume the tensor, returning the element buffer
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn compute_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }
}
