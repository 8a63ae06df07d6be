use gic_core::{GicError, GicResult};

/// A value that is built at most once, on first request.
#[derive(Debug, Clone, Default)]
pub enum Memo<T> {
    #[default]
    Unbuilt,
    Built(T),
}

impl<T> Memo<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Memo::Built(value) => Some(value),
            Memo::Unbuilt => None,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self, Memo::Built(_))
    }

    /// Return the cached value, running `build` the first time. A failed
    /// build leaves the cell unbuilt.
    pub fn get_or_try_build<F>(&mut self, build: F) -> GicResult<&T>
    where
        F: FnOnce() -> GicResult<T>,
    {
        if let Memo::Unbuilt = self {
            *self = Memo::Built(build()?);
        }
        self.get()
            .ok_or_else(|| GicError::Other("memoized value missing after build".into()))
    }
}
