pub mod file;
pub mod memory;
pub mod traits;

#[cfg(feature = "secure-storage")]
pub mod container;
#[cfg(feature = "secure-storage")]
pub mod encrypted;

#[cfg(feature = "secure-storage")]
pub use container::EncryptedKeyContainer;
#[cfg(feature = "secure-storage")]
pub use encrypted::EncryptedFileSystemKeyStore;
pub use file::FileSystemKeyStore;
pub use memory::InMemoryKeyStore;
pub use traits::JsonWebKeyStore;
