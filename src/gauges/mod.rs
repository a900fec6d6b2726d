//! Gauge lifecycle: create/edit form, two-step delete and the left/right columns

pub mod form;

use log::{debug, error, info};
use std::sync::Arc;

use crate::auth::AdminSession;
use crate::config::ClientOptions;
use crate::error::Error;
use crate::lifecycle::{LifecycleState, Notice, PendingDelete};
use crate::models::{now_timestamp, Gauge, GaugeType, NewGauge, Side};
use crate::store::{to_fields, DocumentStore};

pub use form::GaugeForm;

/// Gauges split by display column, each in synced order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaugeColumns {
    pub left: Vec<Gauge>,
    pub right: Vec<Gauge>,
}

/// Split gauges by side, preserving their relative order
pub fn partition_by_side(gauges: &[Gauge]) -> GaugeColumns {
    let (left, right): (Vec<Gauge>, Vec<Gauge>) = gauges
        .iter()
        .cloned()
        .partition(|gauge| gauge.side == Side::Left);
    GaugeColumns { left, right }
}

/// Owns the gauge form, the edit target and the delete confirmation
pub struct GaugeManager {
    store: Arc<dyn DocumentStore>,
    session: AdminSession,
    collection: String,
    form: GaugeForm,
    state: LifecycleState,
    editing: Option<String>,
    pending_delete: Option<PendingDelete>,
    notice: Option<Notice>,
}

impl GaugeManager {
    /// Create a new GaugeManager
    pub fn new(store: Arc<dyn DocumentStore>, session: AdminSession, options: &ClientOptions) -> Self {
        Self {
            store,
            session,
            collection: options.gauges_collection.clone(),
            form: GaugeForm::default(),
            state: LifecycleState::Idle,
            editing: None,
            pending_delete: None,
            notice: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn form(&self) -> &GaugeForm {
        &self.form
    }

    /// Mutable access to the form buffer
    pub fn form_mut(&mut self) -> &mut GaugeForm {
        &mut self.form
    }

    /// Identifier of the gauge being edited
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Replace one of the form's three color slots
    pub fn set_color_at(&mut self, index: usize, color: &str) -> Result<(), Error> {
        self.form.set_color_at(index, color)
    }

    /// Open an empty create form
    pub fn open_form(&mut self) -> Result<(), Error> {
        self.session.require_admin()?;
        self.editing = None;
        self.pending_delete = None;
        self.form = GaugeForm::default();
        self.state = LifecycleState::FormOpen;
        Ok(())
    }

    /// Close the create or edit form and reset it
    pub fn cancel_form(&mut self) {
        self.form = GaugeForm::default();
        self.editing = None;
        if matches!(self.state, LifecycleState::FormOpen | LifecycleState::EditOpen) {
            self.state = LifecycleState::Idle;
        }
    }

    /// Fill the form and create the gauge
    pub async fn create_gauge(
        &mut self,
        title: &str,
        value: f64,
        gauge_type: GaugeType,
        colors: Vec<String>,
        side: Side,
    ) -> Result<String, Error> {
        self.session.require_admin()?;
        self.editing = None;
        self.form = GaugeForm {
            title: title.to_string(),
            value,
            gauge_type,
            colors,
            side,
        };
        self.submit_new().await
    }

    /// Create a gauge from the form, returning its identifier.
    ///
    /// On success the form resets to its defaults and closes.
    pub async fn submit_new(&mut self) -> Result<String, Error> {
        self.session.require_admin()?;
        self.pending_delete = None;
        self.state = LifecycleState::FormOpen;

        let fields = match self.form.validated() {
            Ok(fields) => fields,
            Err(e) => return Err(self.reject(e)),
        };
        let record = to_fields(&NewGauge {
            fields,
            created_at: now_timestamp(),
        })?;

        self.state = LifecycleState::Submitting;
        match self.store.create(&self.collection, record).await {
            Ok(id) => {
                info!("created gauge {}", id);
                self.finish();
                Ok(id)
            }
            Err(e) => {
                error!("creating gauge failed: {}", e);
                self.notice = Notice::for_error(&e);
                self.state = LifecycleState::FormOpen;
                Err(e)
            }
        }
    }

    /// Load `gauge` into the form and remember it as the edit target
    pub fn open_editor(&mut self, gauge: &Gauge) -> Result<(), Error> {
        self.session.require_admin()?;
        self.form = GaugeForm::from_gauge(gauge);
        self.editing = Some(gauge.id.clone());
        self.pending_delete = None;
        self.state = LifecycleState::EditOpen;
        Ok(())
    }

    /// Write the form back to the gauge being edited.
    ///
    /// Only title, value, type, colors and side are sent; `createdAt` and the
    /// identifier stay as stored. Does nothing when no gauge is being edited.
    pub async fn update_gauge(&mut self) -> Result<(), Error> {
        let Some(id) = self.editing.clone() else {
            debug!("update requested with no gauge being edited");
            return Ok(());
        };
        self.session.require_admin()?;

        let fields = match self.form.validated() {
            Ok(fields) => fields,
            Err(e) => return Err(self.reject(e)),
        };
        let update = to_fields(&fields)?;
        self.pending_delete = None;

        self.state = LifecycleState::Submitting;
        match self.store.update(&self.collection, &id, update).await {
            Ok(()) => {
                info!("updated gauge {}", id);
                self.finish();
                Ok(())
            }
            Err(e) => {
                error!("updating gauge {} failed: {}", id, e);
                self.notice = Notice::for_error(&e);
                self.state = LifecycleState::EditOpen;
                Err(e)
            }
        }
    }

    /// Ask for confirmation before deleting `gauge`
    pub fn request_delete(&mut self, gauge: &Gauge) -> Result<(), Error> {
        self.session.require_admin()?;
        self.pending_delete = Some(PendingDelete {
            id: gauge.id.clone(),
            title: gauge.title.clone(),
        });
        self.state = LifecycleState::DeletePending;
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        if self.state == LifecycleState::DeletePending {
            self.state = LifecycleState::Idle;
        }
    }

    /// Delete the pending gauge. Does nothing when no gauge is pending.
    pub async fn confirm_delete(&mut self) -> Result<(), Error> {
        let Some(pending) = self.pending_delete.clone() else {
            return Ok(());
        };
        self.session.require_admin()?;

        match self.store.delete(&self.collection, &pending.id).await {
            Ok(()) => {
                info!("deleted gauge {}", pending.id);
                self.pending_delete = None;
                self.notice = None;
                self.state = LifecycleState::Idle;
                Ok(())
            }
            Err(e) => {
                error!("deleting gauge {} failed: {}", pending.id, e);
                self.notice = Notice::for_error(&e);
                Err(e)
            }
        }
    }

    fn reject(&mut self, e: Error) -> Error {
        debug!("gauge form rejected: {}", e);
        self.notice = Notice::for_error(&e);
        e
    }

    fn finish(&mut self) {
        self.form = GaugeForm::default();
        self.editing = None;
        self.notice = None;
        self.state = LifecycleState::Idle;
    }
}
