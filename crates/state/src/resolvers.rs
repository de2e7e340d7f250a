//! Injected secret and file resolvers.
//!
//! The loader only knows the call signatures; which backend sits behind a
//! reference (local cipher, external secret store, vault, plain file, an
//! S3-compatible store) is a deployment decision made by the caller.

/// Resolves a secret reference to its decrypted value.
pub trait SecretResolver: Send + Sync {
    /// Resolve a reference, returning the decoded value or a detail message
    /// describing why it could not be resolved.
    fn resolve(&self, reference: &str) -> Result<String, String>;
}

/// Fetches the content behind a file reference.
pub trait FileFetcher: Send + Sync {
    /// Fetch the raw bytes behind a reference.
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, String>;
}

/// Resolver for deployments without a secret backend: any secret reference
/// is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecrets;

impl SecretResolver for NoSecrets {
    fn resolve(&self, reference: &str) -> Result<String, String> {
        Err(format!("no secret backend configured for '{reference}'"))
    }
}

/// Fetcher for deployments without a file source: any file reference is an
/// error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFiles;

impl FileFetcher for NoFiles {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>, String> {
        Err(format!("no file source configured for '{reference}'"))
    }
}
