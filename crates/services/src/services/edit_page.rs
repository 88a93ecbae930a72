//! Controller behind the create/edit page of an admin collection.

use std::sync::Arc;

use serde_json::Value;
use store::models::form_schema::{FormData, FormSchema, SchemaError};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{
    admin_api::{ApiTransport, CollectionApi, FormKind, TransportError},
    forms::{build_formdata, prepare_submit_formdata},
    notification::{Navigator, Notifier},
    validation::{FormErrors, FormValidator, SchemaValidator},
};

pub const SAVED_MESSAGE: &str = "saved";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EditMode {
    #[default]
    New,
    Edit,
}

/// How a submission ended when the backend (or the validator) answered.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 200: the user was notified and navigated back.
    Saved,
    /// Client-side validation failed; nothing was sent.
    Invalid(FormErrors),
    /// 400 from the backend, with its per-field errors if it sent any.
    Rejected { form_errors: Option<Value> },
    Unexpected(u16),
}

#[derive(Debug, Error)]
pub enum EditPageError {
    #[error("edit mode requires an entity id")]
    MissingId,
    #[error("failed to load {what}: status {status}")]
    LoadFailed { what: &'static str, status: u16 },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPageState {
    pub schema: Option<FormSchema>,
    pub edit_formdata: FormData,
    pub entity_id: Option<String>,
    pub submit_disabled: bool,
    /// A save request is in flight.
    pub saving: bool,
}

pub struct EditPage {
    transport: Arc<dyn ApiTransport>,
    api: CollectionApi,
    mode: EditMode,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    validator: Arc<dyn FormValidator>,
    /// Fixed fields merged into every payload, overriding form values.
    extra_formdata: FormData,
    state: RwLock<EditPageState>,
}

impl EditPage {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        api: CollectionApi,
        mode: EditMode,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            api,
            mode,
            notifier,
            navigator,
            validator: Arc::new(SchemaValidator),
            extra_formdata: FormData::new(),
            state: RwLock::new(EditPageState::default()),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn FormValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_extra_formdata(mut self, extra: FormData) -> Self {
        self.extra_formdata = extra;
        self
    }

    /// Use an already known schema instead of fetching it in [`EditPage::load`].
    pub fn with_schema(mut self, schema: FormSchema) -> Self {
        self.state.get_mut().schema = Some(schema);
        self
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub async fn state(&self) -> EditPageState {
        self.state.read().await.clone()
    }

    pub async fn formdata(&self) -> FormData {
        self.state.read().await.edit_formdata.clone()
    }

    pub async fn submit_disabled(&self) -> bool {
        self.state.read().await.submit_disabled
    }

    pub async fn set_formdata(&self, formdata: FormData) {
        self.state.write().await.edit_formdata = formdata;
    }

    pub async fn set_field(&self, key: impl Into<String>, value: Value) {
        self.state.write().await.edit_formdata.insert(key.into(), value);
    }

    /// Fetch the edit form (unless one was supplied) and seed the form-data: from the entity in
    /// edit mode, from the panel defaults in new mode.
    pub async fn load(&self, id: Option<&str>) -> Result<(), EditPageError> {
        let known = self.state.read().await.schema.clone();
        let schema = match known {
            Some(schema) => schema,
            None => self.fetch_schema().await?,
        };

        let entity = match (self.mode, id) {
            (EditMode::New, _) => FormData::new(),
            (EditMode::Edit, None) => return Err(EditPageError::MissingId),
            (EditMode::Edit, Some(id)) => self.fetch_entity(id).await?,
        };
        let formdata = build_formdata(Some(&schema), Some(&entity)).unwrap_or_default();

        let mut state = self.state.write().await;
        debug!(mode = %self.mode, fields = formdata.len(), "edit form loaded");
        state.schema = Some(schema);
        state.edit_formdata = formdata;
        state.entity_id = id.map(str::to_string);
        Ok(())
    }

    pub async fn submit_data(&self) -> Result<SubmitOutcome, EditPageError> {
        let (schema, formdata, entity_id) = {
            let mut state = self.state.write().await;
            state.submit_disabled = true;
            (
                state.schema.clone(),
                state.edit_formdata.clone(),
                state.entity_id.clone(),
            )
        };

        let validation = self
            .validator
            .validate(self.mode, schema.as_ref(), &formdata)
            .await;
        if let Err(errors) = validation {
            debug!(fields = errors.len(), "edit form is invalid");
            self.state.write().await.submit_disabled = false;
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let mut payload = match &schema {
            Some(schema) => prepare_submit_formdata(Some(schema), Some(&formdata)),
            None => formdata,
        };
        payload.extend(self.extra_formdata.clone());

        let request = match (self.mode, entity_id) {
            (EditMode::New, _) => self.api.create(payload),
            (EditMode::Edit, Some(id)) => self.api.patch(&id, payload),
            (EditMode::Edit, None) => {
                self.state.write().await.submit_disabled = false;
                return Err(EditPageError::MissingId);
            }
        };

        self.state.write().await.saving = true;
        let result = self.transport.send(request).await;
        {
            let mut state = self.state.write().await;
            state.submit_disabled = false;
            state.saving = false;
        }
        let reply = result?;

        match reply.status {
            200 => {
                info!(mode = %self.mode, collection = self.api.collection(), "entity saved");
                self.notifier.success(SAVED_MESSAGE);
                self.navigator.back();
                Ok(SubmitOutcome::Saved)
            }
            400 => {
                debug!(message = %reply.body.message, "save rejected");
                Ok(SubmitOutcome::Rejected {
                    form_errors: reply.body.form_errors,
                })
            }
            status => {
                warn!(status, "unexpected reply to save");
                Ok(SubmitOutcome::Unexpected(status))
            }
        }
    }

    pub fn cancel(&self) {
        self.navigator.back();
    }

    async fn fetch_schema(&self) -> Result<FormSchema, EditPageError> {
        let reply = self.transport.send(self.api.form(FormKind::Edit)).await?;
        if !reply.is_ok() {
            return Err(EditPageError::LoadFailed {
                what: "form",
                status: reply.status,
            });
        }
        Ok(FormSchema::from_value(
            reply.into_data().unwrap_or(Value::Null),
        )?)
    }

    async fn fetch_entity(&self, id: &str) -> Result<FormData, EditPageError> {
        let reply = self.transport.send(self.api.get(id)).await?;
        if !reply.is_ok() {
            return Err(EditPageError::LoadFailed {
                what: "entity",
                status: reply.status,
            });
        }
        match reply.into_data() {
            Some(Value::Object(entity)) => Ok(entity),
            _ => Ok(FormData::new()),
        }
    }
}
