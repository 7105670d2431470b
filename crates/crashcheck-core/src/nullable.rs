//! Nullness for the `check_null!` / `check_not_null!` family.

/// Values that can be "null": `Option`s and raw pointers.
pub trait Nullable {
    fn is_null_value(&self) -> bool;
}

impl<T> Nullable for Option<T> {
    fn is_null_value(&self) -> bool {
        self.is_none()
    }
}

impl<T: ?Sized> Nullable for *const T {
    fn is_null_value(&self) -> bool {
        self.is_null()
    }
}

impl<T: ?Sized> Nullable for *mut T {
    fn is_null_value(&self) -> bool {
        self.is_null()
    }
}

impl<N: Nullable + ?Sized> Nullable for &N {
    fn is_null_value(&self) -> bool {
        (**self).is_null_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_and_pointers() {
        assert!(None::<u8>.is_null_value());
        assert!(!Some(1).is_null_value());
        assert!(std::ptr::null::<u8>().is_null_value());
        let x = 5_u32;
        assert!(!(&x as *const u32).is_null_value());
        assert!(std::ptr::null_mut::<u8>().is_null_value());
        assert!((&None::<u8>).is_null_value());
    }
}
