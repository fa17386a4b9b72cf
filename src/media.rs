use log::info;

use crate::blob::BlobStore;
use crate::error::AppError;
use crate::models::{Media, NewMedia};
use crate::store::Store;

/// Store the bytes, then record an unattached media row. The row is linked to
/// a tweet later, when the uploader creates one naming this media id.
pub async fn upload(
    store: &dyn Store,
    blobs: &dyn BlobStore,
    uploader_id: i64,
    bytes: &[u8],
    file_name: &str,
) -> Result<Media, AppError> {
    let file_name = blobs.put(file_name, bytes).await?;
    let media = store
        .insert_media(NewMedia {
            file_name,
            uploader_id,
        })
        .await?;

    info!(
        "Media {} ({}, {} bytes) uploaded by user {}",
        media.id,
        media.file_name,
        bytes.len(),
        uploader_id
    );
    Ok(media)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    use crate::blob::sanitize_file_name;
    use crate::store::MemoryStore;

    #[derive(Default)]
    pub(crate) struct MemoryBlobs {
        pub files: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
            let name = sanitize_file_name(file_name)?;
            self.files.lock().await.insert(name.clone(), bytes.to_vec());
            Ok(name)
        }
    }

    #[tokio::test]
    async fn upload_creates_unattached_row() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobs::default();

        let media = upload(&store, &blobs, 1, b"png-bytes", "cat.png")
            .await
            .unwrap();

        assert_eq!(media.tweet_id, None);
        assert_eq!(media.uploader_id, 1);
        assert_eq!(
            blobs.files.lock().await.get("cat.png").map(Vec::as_slice),
            Some(&b"png-bytes"[..])
        );
        assert_eq!(store.find_media(&[media.id]).await.unwrap(), vec![media]);
    }

    #[tokio::test]
    async fn bad_file_name_records_nothing() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobs::default();

        let res = upload(&store, &blobs, 1, b"x", "..").await;

        assert!(matches!(res, Err(AppError::BadRequest(_))));
        assert!(store.find_media(&[1]).await.unwrap().is_empty());
    }
}
