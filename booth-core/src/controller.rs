//! Session controller: drives capture -> stylize -> GIF -> upload for one
//! user session.
//!
//! Every asynchronous flow captures a cancellation token before its first
//! suspension point and re-checks it before each commit. Capture and GIF
//! flows watch the session epoch, which only a retake bumps; download
//! preparation watches its own token, which every preparation attempt
//! bumps as well, so a re-run supersedes the in-flight one without
//! stranding unrelated stylizations.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::session::{PrepareStatus, QrCodes, SessionContext, CUSTOM_MODE, GIF_URL_KEY};
use crate::share::{PreparedShare, ShareGateway};
use crate::stylize::Stylizer;
use crate::types::{GifArtifact, Photo, PhotoId};
use crate::{BoothError, BoothResult};

/// Resolves a style key to its generation prompt. The catalog itself is a
/// static data table owned by the UI layer.
pub trait ModeCatalog: Send + Sync {
    fn prompt_for(&self, mode: &str) -> Option<String>;
}

/// Builds the two-frame before/after GIF from an input/output byte pair
#[async_trait]
pub trait GifBuilder: Send + Sync {
    async fn assemble(&self, input: Bytes, output: Bytes) -> BoothResult<Bytes>;
}

pub struct SessionController {
    ctx: Arc<SessionContext>,
    stylizer: Arc<dyn Stylizer>,
    catalog: Arc<dyn ModeCatalog>,
    gif_builder: Arc<dyn GifBuilder>,
    shares: Arc<dyn ShareGateway>,
}

impl SessionController {
    pub fn new(
        ctx: Arc<SessionContext>,
        stylizer: Arc<dyn Stylizer>,
        catalog: Arc<dyn ModeCatalog>,
        gif_builder: Arc<dyn GifBuilder>,
        shares: Arc<dyn ShareGateway>,
    ) -> Self {
        Self {
            ctx,
            stylizer,
            catalog,
            gif_builder,
            shares,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Capture a photo: record it (busy, newest first), cache the input
    /// frame, and run stylization. Failure marks the photo with an error
    /// field but keeps it visible. Returns the photo id either way.
    pub async fn snap_photo(&self, image: Bytes) -> BoothResult<PhotoId> {
        let id = PhotoId::new();
        let epoch = self.ctx.epoch();

        let (mode, prompt) = {
            let mut state = self.ctx.state();
            let mode = state.active_mode.clone();
            let prompt = if mode == CUSTOM_MODE {
                Some(state.custom_prompt.clone())
            } else {
                self.catalog.prompt_for(&mode)
            };
            state.inputs.insert(id.clone(), image.clone());
            state.photos.insert(0, Photo::new(id.clone(), mode.clone()));
            state.prune_orphan_previews();
            (mode, prompt)
        };

        let Some(prompt) = prompt else {
            // Unknown style key: settle the photo in error state instead of
            // leaving it busy forever.
            let mut state = self.ctx.state();
            if let Some(photo) = state.photo_mut(&id) {
                photo.is_busy = false;
                photo.error = Some(format!("unknown style mode: {mode}"));
            }
            return Ok(id);
        };

        match self.stylizer.submit(&id, image, &prompt).await {
            Ok(output) => {
                {
                    let mut state = self.ctx.state();
                    if self.ctx.epoch() != epoch {
                        // Session was reset while stylizing; drop the result.
                        return Ok(id);
                    }
                    state.outputs.insert(id.clone(), output);
                    if let Some(photo) = state.photo_mut(&id) {
                        photo.is_busy = false;
                    }
                }
                self.maybe_make_gif().await;
            }
            Err(err) => {
                tracing::error!(photo_id = %id, error = %err, "stylization failed");
                let mut state = self.ctx.state();
                if self.ctx.epoch() == epoch {
                    if let Some(photo) = state.photo_mut(&id) {
                        photo.is_busy = false;
                        photo.error = Some(err.to_string());
                    }
                }
            }
        }

        Ok(id)
    }

    /// Remove one photo and its cached payloads
    pub fn delete_photo(&self, id: &PhotoId) {
        let mut state = self.ctx.state();
        state.photos.retain(|p| p.id != *id);
        state.inputs.remove(id);
        state.outputs.remove(id);
        state.prepared.remove(id);
        state.prune_orphan_previews();
    }

    /// Cache a watermarked preview, unless the photo already left the queue
    pub fn store_watermarked_preview(&self, id: &PhotoId, preview: Bytes) {
        let mut state = self.ctx.state();
        if state.photo(id).is_some() {
            state.watermarked_previews.insert(id.clone(), preview);
        }
    }

    /// Level-triggered GIF creation: fires once at least one photo finished
    /// stylization, no GIF exists, and none is being assembled. Idempotent
    /// while an assembly is in flight.
    pub async fn maybe_make_gif(&self) -> Option<Bytes> {
        {
            let state = self.ctx.state();
            let has_ready = state.photos.iter().any(Photo::is_ready);
            if !has_ready || state.gif.is_some() || state.gif_in_progress {
                return None;
            }
        }
        self.make_gif().await
    }

    /// Assemble the before/after GIF from the newest ready photo.
    ///
    /// "No GIF" is a valid, retryable outcome: missing payloads or an
    /// assembly failure return `None` without corrupting the session.
    /// Success releases the previous artifact before installing the new
    /// one, collapses the queue to the surviving photo, and prunes the
    /// byte maps accordingly.
    pub async fn make_gif(&self) -> Option<Bytes> {
        let epoch = self.ctx.epoch();

        let (latest_id, input, output) = {
            let mut state = self.ctx.state();
            if state.gif_in_progress {
                return None;
            }
            let latest = match state.photos.iter().find(|p| !p.is_busy) {
                Some(photo) => photo.id.clone(),
                None => {
                    tracing::warn!("gif requested without any ready photos");
                    return None;
                }
            };
            let input = state.inputs.get(&latest).cloned();
            let output = state.outputs.get(&latest).cloned();
            let (Some(input), Some(output)) = (input, output) else {
                tracing::warn!(photo_id = %latest, "missing input or output image data for gif");
                return None;
            };
            state.gif_in_progress = true;
            (latest, input, output)
        };

        let assembled = self.gif_builder.assemble(input, output).await;

        if self.ctx.epoch() != epoch {
            // Reset landed mid-encode; the reset already cleared the flag.
            return None;
        }

        let mut state = self.ctx.state();
        state.gif_in_progress = false;

        let bytes = match assembled {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(error = %err, "gif assembly failed");
                return None;
            }
        };

        let artifact = match self.ctx.scratch_dir() {
            Some(dir) => {
                let path = dir.join(format!("{}.gif", PhotoId::new()));
                match std::fs::write(&path, &bytes) {
                    Ok(()) => GifArtifact::with_scratch_file(bytes.clone(), path),
                    Err(err) => {
                        tracing::warn!(error = %err, "gif scratch write failed, keeping in memory");
                        GifArtifact::in_memory(bytes.clone())
                    }
                }
            }
            None => GifArtifact::in_memory(bytes.clone()),
        };

        if let Some(previous) = state.gif.take() {
            previous.release();
        }
        state.gif = Some(artifact);

        // Only the surviving photo keeps its payloads.
        state.photos.retain(|p| p.id == latest_id);
        state.inputs.retain(|id, _| *id == latest_id);
        state.outputs.retain(|id, _| *id == latest_id);
        state.prune_orphan_previews();

        Some(bytes)
    }

    /// Prepare the photo + GIF share links and QR codes for one photo.
    ///
    /// Repeat calls short-circuit on a settled status unless `force` is
    /// set. Each call claims a fresh preparation token, so a newer call
    /// supersedes any preparation still in flight: the older continuation
    /// finds its token stale and commits nothing. Stylizations running
    /// alongside are untouched.
    pub async fn prepare_downloads(&self, photo_id: &PhotoId, force: bool) -> bool {
        let (photo_bytes, photo_ready, gif_ready) = {
            let state = self.ctx.state();

            match state.prepared.get(photo_id) {
                Some(PrepareStatus::Ready) if !force => return true,
                Some(PrepareStatus::Errored) if !force => return false,
                _ => {}
            }
            let Some(photo) = state.photo(photo_id) else {
                return false;
            };
            if photo.is_busy {
                return false;
            }
            let Some(bytes) = state.outputs.get(photo_id).cloned() else {
                return false;
            };

            let photo_ready = state.qr_codes.photo.is_some()
                && state.cloud_urls.contains_key(photo_id.as_str());
            let gif_ready =
                state.qr_codes.gif.is_some() && state.cloud_urls.contains_key(GIF_URL_KEY);
            (bytes, photo_ready, gif_ready)
        };

        if photo_ready && gif_ready && !force {
            self.ctx
                .state()
                .prepared
                .insert(photo_id.clone(), PrepareStatus::Ready);
            return true;
        }

        let token = self.ctx.next_prepare_token();
        self.ctx.state().is_uploading = true;

        let outcome = self
            .prepare_inner(photo_id, photo_bytes, photo_ready, gif_ready, token)
            .await;

        if self.ctx.prepare_token() == token {
            self.ctx.state().is_uploading = false;
        }

        match outcome {
            Ok(committed) => committed,
            Err(err) => {
                tracing::error!(photo_id = %photo_id, error = %err, "error preparing downloads");
                if self.ctx.prepare_token() == token {
                    self.ctx
                        .state()
                        .prepared
                        .insert(photo_id.clone(), PrepareStatus::Errored);
                }
                false
            }
        }
    }

    async fn prepare_inner(
        &self,
        photo_id: &PhotoId,
        photo_bytes: Bytes,
        photo_ready: bool,
        gif_ready: bool,
        token: u64,
    ) -> BoothResult<bool> {
        let existing_gif = {
            let state = self.ctx.state();
            state.gif.as_ref().map(|g| g.bytes().clone())
        };
        let gif_bytes = match existing_gif {
            Some(bytes) => Some(bytes),
            None => self.make_gif().await,
        };
        let Some(gif_bytes) = gif_bytes else {
            return Err(BoothError::share("GIF is not available after generation"));
        };

        if self.ctx.prepare_token() != token {
            return Ok(false);
        }

        let stamp = chrono::Utc::now().timestamp_millis();

        let photo_share = if photo_ready {
            self.cached_share(Some(photo_id))
        } else {
            None
        };
        let photo_share = match photo_share {
            Some(share) => share,
            None => {
                self.shares
                    .upload(
                        photo_bytes,
                        &format!("digioh-photobooth-foto-{stamp}.jpg"),
                        false,
                    )
                    .await?
            }
        };

        if self.ctx.prepare_token() != token {
            return Ok(false);
        }

        let gif_share = if gif_ready { self.cached_share(None) } else { None };
        let gif_share = match gif_share {
            Some(share) => share,
            None => {
                self.shares
                    .upload(
                        gif_bytes,
                        &format!("digioh-photobooth-gif-{stamp}.gif"),
                        true,
                    )
                    .await?
            }
        };

        if self.ctx.prepare_token() != token {
            return Ok(false);
        }

        let mut state = self.ctx.state();
        state.qr_codes.photo = Some(photo_share.qr_code);
        state.qr_codes.gif = Some(gif_share.qr_code);
        state
            .cloud_urls
            .insert(photo_id.as_str().to_string(), photo_share.direct_url);
        state
            .cloud_urls
            .insert(GIF_URL_KEY.to_string(), gif_share.direct_url);
        state
            .prepared
            .insert(photo_id.clone(), PrepareStatus::Ready);

        Ok(true)
    }

    /// Rebuild a [`PreparedShare`] from the session caches. `None` photo id
    /// means the GIF slot.
    fn cached_share(&self, photo_id: Option<&PhotoId>) -> Option<PreparedShare> {
        let state = self.ctx.state();
        let (qr, url_key) = match photo_id {
            Some(id) => (state.qr_codes.photo.clone(), id.as_str().to_string()),
            None => (state.qr_codes.gif.clone(), GIF_URL_KEY.to_string()),
        };
        Some(PreparedShare {
            direct_url: state.cloud_urls.get(&url_key)?.clone(),
            qr_code: qr?,
        })
    }

    /// Retake/reset: bump the session epoch so in-flight work from the
    /// previous session can never surface, then clear every session-scoped
    /// map, release the GIF handle, and stop the camera stream.
    pub fn reset(&self) {
        self.ctx.next_epoch();

        let mut state = self.ctx.state();
        state.photos.clear();
        state.inputs.clear();
        state.outputs.clear();
        state.watermarked_previews.clear();
        if let Some(gif) = state.gif.take() {
            gif.release();
        }
        state.gif_in_progress = false;
        state.prepared.clear();
        state.qr_codes = QrCodes::default();
        state.cloud_urls.clear();
        state.is_uploading = false;
        if let Some(camera) = state.camera.take() {
            camera.stop();
        }

        tracing::info!("session reset for next user");
    }
}
