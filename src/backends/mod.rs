//! Provider implementations.

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "windows-provider")]
pub mod windows;

/// Registers all compiled providers with the factory.
///
/// Called once by [`crate::init`].
pub fn register_all() {
    #[cfg(feature = "mock")]
    mock::register();

    #[cfg(feature = "windows-provider")]
    windows::register();
}
