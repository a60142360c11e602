//! Generic REST controller over one document class.

use crate::controller::options::ResourceOptions;
use crate::controller::request::{ListPage, ListRequest};
use crate::error::AppError;
use crate::odm::FieldAccess;
use crate::registry::ServiceRegistry;
use serde_json::Value;
use std::sync::Arc;

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Document with id {} could not be found in the database", id))
}

/// Stateless across requests: every call resolves its collaborators from the options.
#[derive(Clone)]
pub struct RestController {
    options: ResourceOptions,
}

impl RestController {
    pub fn new(options: impl Into<ResourceOptions>) -> Self {
        RestController {
            options: options.into(),
        }
    }

    pub fn set_service_registry(&mut self, registry: Arc<ServiceRegistry>) {
        self.options.set_service_registry(registry);
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// One page of documents matching the request criteria, plus the total match count.
    pub async fn get_list(&self, request: &ListRequest) -> Result<ListPage, AppError> {
        let class = self.options.document_class();
        let dm = self.options.document_manager()?;
        let serializer = self.options.serializer()?;
        let meta = dm.class_metadata(class)?;
        let criteria: Vec<(String, Value)> = request
            .criteria
            .iter()
            .map(|(field, raw)| (field.clone(), meta.coerce_query_value(field, raw)))
            .collect();

        let mut count = dm.create_query_builder(class)?;
        for (field, value) in &criteria {
            count = count.equals(field.clone(), value.clone());
        }
        let total = count.count().await?;

        let mut page = dm
            .create_query_builder(class)?
            .limit(request.limit)
            .skip(request.offset);
        for (field, value) in criteria {
            page = page.equals(field, value);
        }
        for spec in &request.sort {
            page = page.sort(spec.field.clone(), spec.direction);
        }
        let items = page
            .execute()
            .await?
            .iter()
            .map(|document| serializer.to_value(document, &meta))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(class = %class, offset = request.offset, returned = items.len(), total, "list");

        Ok(ListPage {
            items,
            offset: request.offset,
            total,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Value, AppError> {
        let class = self.options.document_class();
        let dm = self.options.document_manager()?;
        let meta = dm.class_metadata(class)?;
        let raw = dm
            .create_query_builder(class)?
            .equals(meta.identifier.clone(), meta.parse_identifier(id)?)
            .single_raw()
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(self.options.serializer()?.apply_serialize_metadata(raw, &meta)?)
    }

    pub async fn create(&self, body: Value) -> Result<Value, AppError> {
        let class = self.options.document_class();
        let dm = self.options.document_manager()?;
        let serializer = self.options.serializer()?;
        let meta = dm.class_metadata(class)?;

        let document = serializer.from_value(body, &meta)?;
        let result = self.options.validator()?.validate(&document, &meta);
        if !result.valid {
            return Err(AppError::InvalidArgument(result.messages.join(", ")));
        }

        let mut uow = dm.unit_of_work();
        let handle = uow.persist(document);
        uow.flush().await?;
        Ok(serializer.to_value(uow.document(handle)?, &meta)?)
    }

    /// Apply body fields to the stored document. A document failing validation is detached, never written.
    pub async fn update(&self, id: &str, body: Value) -> Result<Value, AppError> {
        let class = self.options.document_class();
        let dm = self.options.document_manager()?;
        let meta = dm.class_metadata(class)?;
        let Value::Object(fields) = body else {
            return Err(AppError::BadRequest("update body must be a JSON object".into()));
        };

        let mut uow = dm.unit_of_work();
        let handle = uow
            .find(class, &meta.parse_identifier(id)?)
            .await?
            .ok_or_else(|| not_found(id))?;
        {
            let document = uow.document_mut(handle)?;
            for (field, value) in fields {
                document.set_field(&meta, &field, value)?;
            }
        }

        let result = self.options.validator()?.validate(uow.document(handle)?, &meta);
        if !result.valid {
            uow.detach(handle);
            return Err(AppError::InvalidArgument(result.messages.join(", ")));
        }

        uow.flush().await?;
        Ok(self.options.serializer()?.to_value(uow.document(handle)?, &meta)?)
    }

    /// Remove by identifier. Removing an absent document is not an error.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let class = self.options.document_class();
        let dm = self.options.document_manager()?;
        let meta = dm.class_metadata(class)?;
        let removed = dm
            .create_query_builder(class)?
            .equals(meta.identifier.clone(), meta.parse_identifier(id)?)
            .remove()
            .await?;
        tracing::debug!(class = %class, id = %id, removed, "delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldType, ResourceConfig, ValidationRule};
    use crate::odm::{
        ClassMetadata, DocumentManager, EventManager, FieldMapping, MemoryStore, MetadataRegistry, SortDirection,
        SortSpec, VersionSubscriber, VERSION_NUMBER,
    };
    use serde_json::json;

    const CLASS: &str = "App\\Book";

    fn controller() -> (RestController, Arc<DocumentManager>) {
        let mut metadata = MetadataRegistry::new();
        metadata.register(
            ClassMetadata::new(CLASS)
                .with_field(FieldMapping::new("title", FieldType::String).with_validation(ValidationRule {
                    required: Some(true),
                    ..ValidationRule::default()
                }))
                .with_field(FieldMapping::new("pages", FieldType::Int))
                .with_field(FieldMapping::new("rev", FieldType::Int).with_annotation(VERSION_NUMBER)),
        );
        let mut events = EventManager::new();
        events.add_subscriber(Arc::new(VersionSubscriber));
        let dm = Arc::new(DocumentManager::new(Arc::new(MemoryStore::new()), metadata).with_event_manager(events));
        let mut registry = ServiceRegistry::default();
        registry.register_document_manager("odm.documentmanager.odm_default", dm.clone());
        let mut controller = RestController::new(ResourceConfig::new(CLASS));
        controller.set_service_registry(Arc::new(registry));
        (controller, dm)
    }

    async fn seed(c: &RestController) {
        for (id, title, pages) in [("b1", "Dune", 412), ("b2", "Emma", 474), ("b3", "Ubik", 202)] {
            c.create(json!({"id": id, "title": title, "pages": pages})).await.unwrap();
        }
    }

    #[tokio::test]
    async fn list_filters_sorts_and_pages() {
        let (c, _) = controller();
        seed(&c).await;
        let req = ListRequest {
            offset: 0,
            limit: 2,
            criteria: vec![],
            sort: vec![SortSpec::new("pages", SortDirection::Desc)],
        };
        let page = c.get_list(&req).await.unwrap();
        assert_eq!(page.content_range(), "0-2/3");
        assert_eq!(page.items[0]["title"], json!("Emma"));
        assert_eq!(page.items[1]["title"], json!("Dune"));

        let req = ListRequest::new(Some("items=0-9"), Some("pages=202"), 30).unwrap();
        let page = c.get_list(&req).await.unwrap();
        assert_eq!(page.content_range(), "0-1/1");
        assert_eq!(page.items[0]["id"], json!("b3"));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (c, _) = controller();
        match c.get("nope").await {
            Err(AppError::NotFound(msg)) => {
                assert_eq!(msg, "Document with id nope could not be found in the database")
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn create_rejects_invalid_and_persists_nothing() {
        let (c, dm) = controller();
        let err = c.create(json!({"pages": "many"})).await.unwrap_err();
        match err {
            AppError::InvalidArgument(msg) => assert_eq!(msg, "title is required, pages must be of type int"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(dm.create_query_builder(CLASS).unwrap().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_returns_generated_fields() {
        let (c, _) = controller();
        let created = c.create(json!({"title": "Solaris"})).await.unwrap();
        assert!(created["id"].is_string());
        assert_eq!(created["rev"], json!(1));
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(c.get(&id).await.unwrap()["title"], json!("Solaris"));
    }

    #[tokio::test]
    async fn failed_update_leaves_store_untouched() {
        let (c, _) = controller();
        seed(&c).await;
        let before = c.get("b1").await.unwrap();
        let err = c.update("b1", json!({"title": null})).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(c.get("b1").await.unwrap(), before);

        let updated = c.update("b1", json!({"pages": 500})).await.unwrap();
        assert_eq!(updated["pages"], json!(500));
        assert_eq!(updated["rev"], json!(2));
    }

    #[tokio::test]
    async fn update_missing_is_not_found_and_delete_is_idempotent() {
        let (c, _) = controller();
        assert!(matches!(c.update("zz", json!({})).await, Err(AppError::NotFound(_))));
        seed(&c).await;
        c.delete("b2").await.unwrap();
        c.delete("b2").await.unwrap();
        assert!(matches!(c.get("b2").await, Err(AppError::NotFound(_))));
    }
}
