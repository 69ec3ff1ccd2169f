use std::{io, path::PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Where the client keeps its bearer token between requests.
#[async_trait]
pub trait TokenStore: Send + Sync {
	async fn load(&self) -> io::Result<Option<String>>;

	async fn save(&self, token: &str) -> io::Result<()>;

	async fn clear(&self) -> io::Result<()>;
}

/// Keeps the token for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
	token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
	async fn load(&self) -> io::Result<Option<String>> {
		Ok(self.token.read().await.clone())
	}

	async fn save(&self, token: &str) -> io::Result<()> {
		*self.token.write().await = Some(token.to_owned());
		Ok(())
	}

	async fn clear(&self) -> io::Result<()> {
		*self.token.write().await = None;
		Ok(())
	}
}

/// Keeps the token in a file, so it survives restarts.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
	path: PathBuf,
}

impl FileTokenStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl TokenStore for FileTokenStore {
	async fn load(&self) -> io::Result<Option<String>> {
		match tokio::fs::read_to_string(&self.path).await {
			Ok(token) => {
				let token = token.trim();

				Ok((!token.is_empty()).then(|| token.to_owned()))
			}
			Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(error) => Err(error),
		}
	}

	async fn save(&self, token: &str) -> io::Result<()> {
		if let Some(parent) = self.path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		tokio::fs::write(&self.path, token).await
	}

	async fn clear(&self) -> io::Result<()> {
		match tokio::fs::remove_file(&self.path).await {
			Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
			_ => Ok(()),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[tokio::test]
	async fn test_memory_store() {
		let store = MemoryTokenStore::new();

		assert_eq!(store.load().await.unwrap(), None);

		store.save("abc").await.unwrap();

		assert_eq!(store.load().await.unwrap().as_deref(), Some("abc"));

		store.clear().await.unwrap();

		assert_eq!(store.load().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_file_store() {
		let path = std::env::temp_dir()
			.join(format!("sportsmeet-{}", uuid::Uuid::new_v4()))
			.join("token");
		let store = FileTokenStore::new(&path);

		assert_eq!(store.load().await.unwrap(), None);

		store.save("abc").await.unwrap();

		assert_eq!(store.load().await.unwrap().as_deref(), Some("abc"));
		assert_eq!(
			FileTokenStore::new(&path).load().await.unwrap().as_deref(),
			Some("abc")
		);

		store.clear().await.unwrap();
		store.clear().await.unwrap();

		assert_eq!(store.load().await.unwrap(), None);
	}
}
