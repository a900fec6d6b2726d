//! Post lifecycle: the create form, image intake and two-step delete

pub mod image;

use log::{debug, error, info};
use std::path::Path;
use std::sync::Arc;

use crate::auth::AdminSession;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::lifecycle::{required, LifecycleState, Notice, PendingDelete};
use crate::models::{now_timestamp, NewPost, Post};
use crate::store::{to_fields, DocumentStore};

/// Working copy of the create-post form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    /// Encoded image, once one has been attached
    pub image: Option<String>,
}

/// Owns the create-post form and the delete confirmation for posts.
///
/// New posts are not inserted locally; they show up when the sync channel
/// publishes the store's next snapshot.
pub struct PostManager {
    store: Arc<dyn DocumentStore>,
    session: AdminSession,
    collection: String,
    max_image_bytes: usize,
    form: PostForm,
    state: LifecycleState,
    pending_delete: Option<PendingDelete>,
    notice: Option<Notice>,
}

impl PostManager {
    /// Create a new PostManager
    pub fn new(store: Arc<dyn DocumentStore>, session: AdminSession, options: &ClientOptions) -> Self {
        Self {
            store,
            session,
            collection: options.posts_collection.clone(),
            max_image_bytes: options.max_image_bytes,
            form: PostForm::default(),
            state: LifecycleState::Idle,
            pending_delete: None,
            notice: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn form(&self) -> &PostForm {
        &self.form
    }

    /// Post waiting for delete confirmation
    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    /// Last failure to show the user
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Open the create form
    pub fn open_form(&mut self) -> Result<(), Error> {
        self.session.require_admin()?;
        self.pending_delete = None;
        self.state = LifecycleState::FormOpen;
        Ok(())
    }

    /// Close the create form and discard its contents
    pub fn cancel_form(&mut self) {
        self.form = PostForm::default();
        if self.state == LifecycleState::FormOpen {
            self.state = LifecycleState::Idle;
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.form.title = title.to_string();
    }

    pub fn set_text(&mut self, text: &str) {
        self.form.text = text.to_string();
    }

    /// Read an image file and attach it to the form.
    ///
    /// A later call replaces an earlier attachment. On failure the previous
    /// attachment is kept and a notice is recorded.
    pub async fn attach_image(&mut self, path: &Path) -> Result<(), Error> {
        let encoded = image::read_image_file(path, self.max_image_bytes).await;
        self.set_image(encoded)
    }

    /// Attach in-memory image bytes of the given media type
    pub fn attach_image_bytes(&mut self, bytes: &[u8], media_type: &str) -> Result<(), Error> {
        let encoded = image::encode_image(bytes, media_type, self.max_image_bytes);
        self.set_image(encoded)
    }

    fn set_image(&mut self, encoded: Result<String, Error>) -> Result<(), Error> {
        match encoded {
            Ok(url) => {
                self.form.image = Some(url);
                Ok(())
            }
            Err(e) => {
                self.notice = Notice::for_error(&e);
                Err(e)
            }
        }
    }

    /// Remove the attached image
    pub fn clear_image(&mut self) {
        self.form.image = None;
    }

    /// Fill the form and submit it
    pub async fn create_post(
        &mut self,
        title: &str,
        text: &str,
        image: Option<String>,
    ) -> Result<String, Error> {
        self.session.require_admin()?;
        self.form = PostForm {
            title: title.to_string(),
            text: text.to_string(),
            image,
        };
        self.submit().await
    }

    /// Validate the form and create the post, returning its identifier.
    ///
    /// Title and text are trimmed and must not be empty. On success the form is
    /// cleared and closed; on failure it stays open with its contents.
    pub async fn submit(&mut self) -> Result<String, Error> {
        self.session.require_admin()?;
        self.pending_delete = None;
        self.state = LifecycleState::FormOpen;

        let record = match self.validated() {
            Ok(record) => record,
            Err(e) => {
                debug!("post form rejected: {}", e);
                self.notice = Notice::for_error(&e);
                return Err(e);
            }
        };
        let fields = to_fields(&record)?;

        self.state = LifecycleState::Submitting;
        match self.store.create(&self.collection, fields).await {
            Ok(id) => {
                info!("created post {}", id);
                self.form = PostForm::default();
                self.notice = None;
                self.state = LifecycleState::Idle;
                Ok(id)
            }
            Err(e) => {
                error!("creating post failed: {}", e);
                self.notice = Notice::for_error(&e);
                self.state = LifecycleState::FormOpen;
                Err(e)
            }
        }
    }

    fn validated(&self) -> Result<NewPost, Error> {
        Ok(NewPost {
            title: required("Title", &self.form.title)?,
            text: required("Text", &self.form.text)?,
            image: self.form.image.clone().unwrap_or_default(),
            created_at: now_timestamp(),
        })
    }

    /// Ask for confirmation before deleting `post`
    pub fn request_delete(&mut self, post: &Post) -> Result<(), Error> {
        self.session.require_admin()?;
        self.pending_delete = Some(PendingDelete {
            id: post.id.clone(),
            title: post.title.clone(),
        });
        self.state = LifecycleState::DeletePending;
        Ok(())
    }

    /// Drop the pending delete without touching the store
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        if self.state == LifecycleState::DeletePending {
            self.state = LifecycleState::Idle;
        }
    }

    /// Delete the pending post. Does nothing when no post is pending.
    ///
    /// If the store call fails the post stays pending so the user can retry or cancel.
    pub async fn confirm_delete(&mut self) -> Result<(), Error> {
        let Some(pending) = self.pending_delete.clone() else {
            return Ok(());
        };
        self.session.require_admin()?;

        match self.store.delete(&self.collection, &pending.id).await {
            Ok(()) => {
                info!("deleted post {}", pending.id);
                self.pending_delete = None;
                self.notice = None;
                self.state = LifecycleState::Idle;
                Ok(())
            }
            Err(e) => {
                error!("deleting post {} failed: {}", pending.id, e);
                self.notice = Notice::for_error(&e);
                Err(e)
            }
        }
    }
}
