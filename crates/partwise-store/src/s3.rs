//! S3-compatible backend over `aws-sdk-s3`

use crate::{ObjectStore, ObjectStream};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use partwise_core::types::{
    ByteRange, CommittedPart, CompletedPart, IntegrityTag, ObjectHandle, ObjectMetadata,
    PartPage, SessionHandle, SessionToken,
};
use partwise_core::{Error, Result, StoreOp};
use tracing::{debug, warn};

fn store_err<E>(op: StoreOp, err: E) -> Error
where
    E: std::error::Error + 'static,
{
    Error::store(op, DisplayErrorContext(err))
}

/// Store backed by an already-configured S3 client
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn find_open_session(&self, bucket: &str, key: &str) -> Result<Option<SessionToken>> {
        let mut key_marker: Option<String> = None;
        let mut upload_id_marker: Option<String> = None;
        // (initiated secs, nanos) of the newest matching upload
        let mut newest: Option<(Option<(i64, u32)>, String)> = None;

        loop {
            let resp = self
                .client
                .list_multipart_uploads()
                .bucket(bucket)
                .prefix(key)
                .set_key_marker(key_marker.clone())
                .set_upload_id_marker(upload_id_marker.clone())
                .send()
                .await
                .map_err(|e| store_err(StoreOp::FindSession, e))?;

            for upload in resp.uploads() {
                // Prefix listing also returns longer keys
                if upload.key() != Some(key) {
                    continue;
                }
                let Some(upload_id) = upload.upload_id() else {
                    continue;
                };
                let initiated = upload.initiated().map(|d| (d.secs(), d.subsec_nanos()));
                let is_newer = newest
                    .as_ref()
                    .map_or(true, |(seen, _)| initiated > *seen);
                if is_newer {
                    newest = Some((initiated, upload_id.to_string()));
                }
            }

            if !resp.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = resp.next_key_marker().map(str::to_string);
            upload_id_marker = resp.next_upload_id_marker().map(str::to_string);
            if key_marker.is_none() && upload_id_marker.is_none() {
                warn!(bucket, key, "Truncated upload listing without markers");
                break;
            }
        }

        Ok(newest.map(|(_, id)| SessionToken::new(id)))
    }

    async fn open_session(&self, bucket: &str, key: &str) -> Result<SessionToken> {
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| store_err(StoreOp::OpenSession, e))?;

        let upload_id = resp
            .upload_id()
            .ok_or_else(|| Error::store(StoreOp::OpenSession, "No upload ID returned"))?;

        debug!(bucket, key, upload_id, "Created multipart upload");
        Ok(SessionToken::new(upload_id))
    }

    async fn list_committed_parts(
        &self,
        session: &SessionHandle,
        cursor: Option<u32>,
    ) -> Result<PartPage> {
        let mut req = self
            .client
            .list_parts()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(session.token.as_str());

        if let Some(marker) = cursor {
            req = req.part_number_marker(marker.to_string());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| store_err(StoreOp::ListParts, e))?;

        let mut parts = Vec::with_capacity(resp.parts().len());
        for part in resp.parts() {
            match (part.part_number(), part.size(), part.e_tag()) {
                (Some(number), Some(size), Some(etag)) if number > 0 && size >= 0 => {
                    parts.push(CommittedPart {
                        part_number: number as u32,
                        size: size as u64,
                        tag: IntegrityTag::new(etag),
                    });
                }
                _ => {
                    return Err(Error::store(
                        StoreOp::ListParts,
                        format!("Incomplete part entry in listing: {:?}", part),
                    ))
                }
            }
        }

        let next_cursor = if resp.is_truncated().unwrap_or(false) {
            let marker = resp.next_part_number_marker().ok_or_else(|| {
                Error::store(StoreOp::ListParts, "Truncated listing without a marker")
            })?;
            let marker = marker.parse::<u32>().map_err(|_| {
                Error::store(
                    StoreOp::ListParts,
                    format!("Unparseable part number marker: {}", marker),
                )
            })?;
            Some(marker)
        } else {
            None
        };

        Ok(PartPage { parts, next_cursor })
    }

    async fn upload_part(
        &self,
        session: &SessionHandle,
        part_number: u32,
        range: ByteRange,
        data: Bytes,
    ) -> Result<IntegrityTag> {
        let op = StoreOp::UploadPart(part_number);
        let resp = self
            .client
            .upload_part()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(session.token.as_str())
            .part_number(part_number as i32)
            .content_length(range.length as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| store_err(op, e))?;

        let etag = resp
            .e_tag()
            .ok_or_else(|| Error::store(op, "No ETag returned"))?;
        Ok(IntegrityTag::new(etag))
    }

    async fn complete_session(
        &self,
        session: &SessionHandle,
        parts: &[CompletedPart],
    ) -> Result<ObjectHandle> {
        let completed_parts: Vec<S3CompletedPart> = parts
            .iter()
            .map(|part| {
                S3CompletedPart::builder()
                    .part_number(part.part_number as i32)
                    .e_tag(part.tag.as_str())
                    .build()
            })
            .collect();

        let completed_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        let resp = self
            .client
            .complete_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(session.token.as_str())
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(|e| store_err(StoreOp::CompleteSession, e))?;

        Ok(ObjectHandle {
            bucket: session.bucket.clone(),
            key: session.key.clone(),
            etag: resp.e_tag().map(str::to_string),
        })
    }

    async fn abort_session(&self, session: &SessionHandle) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(session.token.as_str())
            .send()
            .await
            .map_err(|e| store_err(StoreOp::AbortSession, e))?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<ObjectHandle> {
        let resp = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(data.len() as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| store_err(StoreOp::PutObject, e))?;

        Ok(ObjectHandle {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag: resp.e_tag().map(str::to_string),
        })
    }

    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let resp = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| store_err(StoreOp::ObjectMetadata, e))?;

        Ok(ObjectMetadata {
            size: resp.content_length().unwrap_or(0).max(0) as u64,
            etag: resp.e_tag().map(str::to_string),
        })
    }

    async fn open_object_stream(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| store_err(StoreOp::OpenStream, e))?;

        Ok(Box::pin(resp.body.into_async_read()))
    }
}
