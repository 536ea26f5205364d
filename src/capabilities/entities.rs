//! Monitored entities, entity types and their relationships.

use serde_json::{Map, Value};

use crate::auth::{ApiTransport, QueryParams, Result};
use crate::capabilities::{detail_block, ListEnvelope, MAX_NESTED_DISPLAY};
use crate::format::{capped_join, compact_json, display, key_values, management_zones, truthy};

const ENTITIES_PATH: &str = "/api/v2/entities";
const ENTITY_TYPES_PATH: &str = "/api/v2/entityTypes";

/// Display names longer than this are cut.
const MAX_DISPLAY_NAME_CHARS: usize = 60;

/// Types worth calling out when listing entity types.
const COMMON_ENTITY_TYPES: [&str; 8] = [
    "SERVICE",
    "PROCESS_GROUP",
    "HOST",
    "APPLICATION",
    "CLOUD_APPLICATION",
    "CONTAINER_GROUP_INSTANCE",
    "AWS_LAMBDA_FUNCTION",
    "AZURE_WEB_APP",
];

/// Filters for `/api/v2/entities`.
#[derive(Debug, Clone, Default)]
pub struct EntityQueryParams {
    pub entity_selector: String,
    pub page_size: Option<u32>,
    pub mz_selector: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: Option<String>,
}

/// A `fromRelationships` / `toRelationships` container.
///
/// The API returns these as a map of relation type to targets, but older
/// clusters and proxies have been seen sending lists, nulls and bare strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Relationships {
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
    Null,
    Scalar(Value),
}

impl Relationships {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Relationships::Null,
            Some(Value::Array(items)) => Relationships::Sequence(items.clone()),
            Some(Value::Object(map)) => Relationships::Mapping(map.clone()),
            Some(other) => Relationships::Scalar(other.clone()),
        }
    }

    /// Sequence length, mapping key count, 0 for null, 1 for a scalar.
    pub fn count(&self) -> usize {
        match self {
            Relationships::Sequence(items) => items.len(),
            Relationships::Mapping(map) => map.len(),
            Relationships::Null => 0,
            Relationships::Scalar(value) => usize::from(truthy(Some(value))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Relationships::Sequence(items) => Value::Array(items.clone()),
            Relationships::Mapping(map) => Value::Object(map.clone()),
            Relationships::Null => Value::Null,
            Relationships::Scalar(value) => value.clone(),
        }
    }
}

/// The relationship part of an entity record.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRelationships {
    pub entity_id: Option<String>,
    pub from_relationships: Relationships,
    pub to_relationships: Relationships,
}

/// Client for the entity endpoints.
pub struct EntitiesApi<'a, T: ApiTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: ApiTransport + ?Sized> EntitiesApi<'a, T> {
    pub const API_PAGE_SIZE: u32 = 100;
    /// Entity types are listed in one large page so common types can be spotted.
    pub const ENTITY_TYPES_PAGE_SIZE: u32 = 500;

    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub async fn list_entity_types(&self) -> Result<Value> {
        let mut params = QueryParams::new();
        params.insert("pageSize", Self::ENTITY_TYPES_PAGE_SIZE);

        self.transport.get(ENTITY_TYPES_PATH, &params).await
    }

    pub async fn get_entity_type_details(&self, entity_type: &str) -> Result<Value> {
        let path = format!("{}/{}", ENTITY_TYPES_PATH, urlencoding::encode(entity_type));
        self.transport.get(&path, &QueryParams::new()).await
    }

    pub async fn get_entity_details(&self, entity_id: &str) -> Result<Value> {
        let path = format!("{}/{}", ENTITIES_PATH, urlencoding::encode(entity_id));
        self.transport.get(&path, &QueryParams::new()).await
    }

    /// Entity details reduced to the id and both relationship containers.
    pub async fn get_entity_relationships(&self, entity_id: &str) -> Result<EntityRelationships> {
        let response = self.get_entity_details(entity_id).await?;

        Ok(EntityRelationships {
            entity_id: response
                .get("entityId")
                .and_then(Value::as_str)
                .map(str::to_string),
            from_relationships: Relationships::from_value(response.get("fromRelationships")),
            to_relationships: Relationships::from_value(response.get("toRelationships")),
        })
    }

    pub async fn query_entities(&self, query: &EntityQueryParams) -> Result<Value> {
        let mut params = QueryParams::new();
        params
            .insert(
                "pageSize",
                query
                    .page_size
                    .filter(|&n| n > 0)
                    .unwrap_or(Self::API_PAGE_SIZE),
            )
            .insert("entitySelector", &query.entity_selector)
            .insert_opt("mzSelector", query.mz_selector.as_deref())
            .insert_opt("from", query.from.as_deref())
            .insert_opt("to", query.to.as_deref())
            .insert_opt("sort", query.sort.as_deref());

        self.transport.get(ENTITIES_PATH, &params).await
    }

    pub fn format_entity_list(&self, response: &Value) -> String {
        let envelope = ListEnvelope::from_response(response, "entities");
        let limited = envelope.is_limited();

        let mut result = envelope.header("entities");
        if limited {
            result.push_str(
                "Not showing all matching entities. Consider using more specific filters (entitySelector) to get complete results.\n",
            );
        }

        for entity in envelope.items {
            let entity_type = if truthy(entity.get("type")) {
                entity.get("type")
            } else {
                entity.get("entityType")
            };

            result.push_str(&format!("entityId: {}\n", display(entity.get("entityId"))));
            result.push_str(&format!("  type: {}\n", display(entity_type)));
            result.push_str(&format!(
                "  displayName: {}\n",
                truncate_name(&display(entity.get("displayName")))
            ));

            if let Some(tags) = entity
                .get("tags")
                .and_then(Value::as_array)
                .filter(|t| !t.is_empty())
            {
                let labels = tags.iter().map(tag_label);
                result.push_str(&format!("  tags: {}\n", capped_join(labels, MAX_NESTED_DISPLAY)));
            }

            if let Some(props) = key_values(entity.get("properties"), MAX_NESTED_DISPLAY) {
                result.push_str(&format!("  properties: {}\n", props));
            }

            if let Some(zones) = management_zones(entity.get("managementZones"), MAX_NESTED_DISPLAY) {
                result.push_str(&format!("  Management Zones: {}\n", zones));
            }

            result.push('\n');
        }

        result.push_str("\nNext Steps:\n");
        if envelope.shown() == 0 {
            result.push_str(
                "* Verify that the filters such as entitySelector were correct, and search again with different filters.\n",
            );
        }
        if limited {
            result.push_str("* Use more restrictive filters, such as a more specific entitySelector.\n");
        }
        result.push_str(
            "* If the user is interested in a specific entity, use the get_entity_details tool. Use the entityId (UUID) for detailed analysis.\n",
        );
        result.push_str(
            "* If this has returned the entities that the user wanted, consider using the same entitySelector in subsequent calls such as to list_problems tool if that has not already been done.\n",
        );
        result.push_str(&format!(
            "* Suggest to the user that they view the entities in the Dynatrace UI at {}/\n",
            self.transport.dashboard_url()
        ));

        result
    }

    pub fn format_entity_type_list(&self, response: &Value) -> String {
        let envelope = ListEnvelope::from_response(response, "types");

        let mut concise = String::new();
        let mut common = Vec::new();
        for entity_type in envelope.items {
            let name = display(entity_type.get("type"));
            concise.push_str(&name);

            let display_name = entity_type.get("displayName");
            if truthy(display_name) && display(display_name) != name {
                concise.push_str(&format!(" - {}", display(display_name)));
            }
            concise.push('\n');

            if COMMON_ENTITY_TYPES.contains(&name.as_str()) {
                common.push(name);
            }
        }

        let mut result = envelope.header("entity types");
        if envelope.is_limited() {
            result.push_str("Not showing all matching entity types as there are too many.\n");
        }
        if !common.is_empty() {
            result.push_str(&format!("\nCommon entity types include: {}\n", common.join(", ")));
        }

        result.push('\n');
        result.push_str(&concise);
        result.push_str("\n\nNext Steps:\n");
        result.push_str(
            "* To get details of a particular entity type, use the get_entity_type_details tool, passing in the type name\n",
        );
        result.push_str(
            "* For subsequent user queries, consider using the entity type in the entitySelector parameter like \"type(HOST)\" or \"type(SERVICE)\".\n",
        );

        result
    }

    pub fn format_entity_type_details(&self, response: &Value) -> String {
        detail_block(
            "Entity type details in the following json:",
            response,
            "* To find entities of this type, use discover_entities tool, using the type in the entitySelector such as type(\"HOST\") or type(\"SERVICE\")\n",
        )
    }

    pub fn format_entity_details(&self, response: &Value) -> String {
        let guidance = format!(
            "* Use list_problems or list_events tools with the same entitySelector to check for related issues and events.\n\
             * Suggest to the user that they view the entity in the Dynatrace UI at {}/ui/entity/<entityId>, using the entityId in the URL\n",
            self.transport.dashboard_url()
        );
        detail_block("Entity details in the following json:", response, &guidance)
    }

    pub fn format_entity_relationships(&self, relationships: &EntityRelationships) -> String {
        let num_from = relationships.from_relationships.count();
        let num_to = relationships.to_relationships.count();
        let entity_id = relationships.entity_id.as_deref().unwrap_or("undefined");

        if num_from == 0 && num_to == 0 {
            return format!("No relationships found for entity {}.\n", entity_id);
        }

        let mut result = String::new();
        if num_from > 0 {
            result.push_str(&format!("Found {} fromRelationships:\n", num_from));
            result.push_str(&format!(
                "* {}\n",
                compact_json(&relationships.from_relationships.to_value())
            ));
        }
        if num_to > 0 {
            result.push_str(&format!("Found {} toRelationships:\n", num_to));
            result.push_str(&format!(
                "* {}\n",
                compact_json(&relationships.to_relationships.to_value())
            ));
        }

        result.push_str("Next Steps:\n");
        result.push_str(
            "* Use get_entity_details tool to get more details of this entity, or of entities that it has a relationship to/from.\n",
        );
        result.push_str(
            "* Use list_problems or list_events tools with the same entitySelector by entityId to check for related issues and events.\n",
        );
        result.push_str(&format!(
            "* Suggest to the user that they view the entity in the Dynatrace UI at {}/ui/entity/<entityId>, using the entityId in the URL\n",
            self.transport.dashboard_url()
        ));

        result
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        let kept: String = name.chars().take(MAX_DISPLAY_NAME_CHARS - 3).collect();
        format!("{}...", kept)
    } else {
        name.to_string()
    }
}

fn tag_label(tag: &Value) -> String {
    let key = display(tag.get("key"));
    if truthy(tag.get("value")) {
        format!("{}:{}", key, display(tag.get("value")))
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{params, RecordingTransport};
    use serde_json::json;

    fn relationship_entity() -> Value {
        json!({
            "entityId": "SERVICE-123",
            "displayName": "payment-service",
            "entityType": "SERVICE",
            "fromRelationships": [
                { "id": "rel-1", "type": "CALLS", "fromEntityId": "SERVICE-123", "toEntityId": "SERVICE-456" }
            ],
            "toRelationships": [
                { "id": "rel-2", "type": "RUNS_ON", "fromEntityId": "SERVICE-123", "toEntityId": "HOST-789" }
            ]
        })
    }

    #[tokio::test]
    async fn test_get_entity_details() {
        let transport = RecordingTransport::returning(json!({}));
        let api = EntitiesApi::new(&transport);

        let result = api.get_entity_details("SERVICE-123").await.unwrap();

        let (path, sent) = transport.only_call();
        assert_eq!(path, "/api/v2/entities/SERVICE-123");
        assert!(sent.is_empty());
        assert_eq!(result, json!({}));
    }

    #[tokio::test]
    async fn test_query_entities_all_params() {
        let transport = RecordingTransport::returning(json!({}));
        let api = EntitiesApi::new(&transport);

        api.query_entities(&EntityQueryParams {
            entity_selector: "type(SERVICE)".to_string(),
            page_size: Some(12),
            mz_selector: Some("mzId(123,456)".to_string()),
            from: Some("now-1h".to_string()),
            to: Some("now".to_string()),
            sort: Some("-timestamp".to_string()),
        })
        .await
        .unwrap();

        let (path, sent) = transport.only_call();
        assert_eq!(path, "/api/v2/entities");
        assert_eq!(
            sent,
            params(&[
                ("entitySelector", "type(SERVICE)"),
                ("pageSize", "12"),
                ("mzSelector", "mzId(123,456)"),
                ("from", "now-1h"),
                ("to", "now"),
                ("sort", "-timestamp"),
            ])
        );
    }

    #[tokio::test]
    async fn test_query_entities_defaults() {
        let transport = RecordingTransport::returning(json!({}));
        let api = EntitiesApi::new(&transport);

        api.query_entities(&EntityQueryParams {
            entity_selector: "type(HOST)".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let (_, sent) = transport.only_call();
        assert_eq!(
            sent,
            params(&[("entitySelector", "type(HOST)"), ("pageSize", "100")])
        );
    }

    #[tokio::test]
    async fn test_list_entity_types_page_size() {
        let transport = RecordingTransport::returning(json!({}));
        let api = EntitiesApi::new(&transport);

        api.list_entity_types().await.unwrap();

        let (path, sent) = transport.only_call();
        assert_eq!(path, "/api/v2/entityTypes");
        assert_eq!(sent, params(&[("pageSize", "500")]));
    }

    #[tokio::test]
    async fn test_entity_type_details_encodes_type() {
        let transport = RecordingTransport::returning(json!({}));
        let api = EntitiesApi::new(&transport);

        api.get_entity_type_details("CUSTOM TYPE").await.unwrap();

        let (path, _) = transport.only_call();
        assert_eq!(path, "/api/v2/entityTypes/CUSTOM%20TYPE");
    }

    #[tokio::test]
    async fn test_get_entity_relationships() {
        let transport = RecordingTransport::returning(relationship_entity());
        let api = EntitiesApi::new(&transport);

        let relationships = api.get_entity_relationships("SERVICE-123").await.unwrap();

        assert_eq!(relationships.entity_id.as_deref(), Some("SERVICE-123"));
        assert_eq!(relationships.from_relationships.count(), 1);
        assert_eq!(relationships.to_relationships.count(), 1);

        let result = api.format_entity_relationships(&relationships);
        assert!(result.contains("Found 1 fromRelationship"));
        assert!(result.contains("\"id\":\"rel-1\""));
        assert!(result.contains("Found 1 toRelationship"));
        assert!(result.contains("\"id\":\"rel-2\""));
    }

    #[tokio::test]
    async fn test_no_relationships() {
        let transport = RecordingTransport::returning(json!({
            "entityId": "SERVICE-123",
            "displayName": "isolated-service",
            "entityType": "SERVICE"
        }));
        let api = EntitiesApi::new(&transport);

        let relationships = api.get_entity_relationships("SERVICE-123").await.unwrap();
        assert_eq!(relationships.from_relationships, Relationships::Null);

        let result = api.format_entity_relationships(&relationships);
        assert!(result.contains("No relationships found for entity SERVICE-123"));
    }

    #[tokio::test]
    async fn test_null_relationships() {
        let transport = RecordingTransport::returning(json!({
            "entityId": "SERVICE-123",
            "fromRelationships": null,
            "toRelationships": null
        }));
        let api = EntitiesApi::new(&transport);

        let relationships = api.get_entity_relationships("SERVICE-123").await.unwrap();
        let result = api.format_entity_relationships(&relationships);
        assert!(result.contains("No relationships found for entity SERVICE-123"));
    }

    #[tokio::test]
    async fn test_non_array_relationships() {
        let transport = RecordingTransport::returning(json!({
            "entityId": "SERVICE-123",
            "fromRelationships": "not-an-array",
            "toRelationships": { "unexpectedKey": "unexpected-val" }
        }));
        let api = EntitiesApi::new(&transport);

        let relationships = api.get_entity_relationships("SERVICE-123").await.unwrap();
        let result = api.format_entity_relationships(&relationships);

        assert!(result.contains("Found 1 fromRelationship"));
        assert!(result.contains("not-an-array"));
        assert!(result.contains("Found 1 toRelationship"));
        assert!(result.contains("{\"unexpectedKey\":\"unexpected-val\"}"));
    }

    #[test]
    fn test_relationship_counts() {
        assert_eq!(Relationships::from_value(Some(&json!([1, 2, 3]))).count(), 3);
        assert_eq!(
            Relationships::from_value(Some(&json!({"calls": [], "runsOn": []}))).count(),
            2
        );
        assert_eq!(Relationships::from_value(Some(&Value::Null)).count(), 0);
        assert_eq!(Relationships::from_value(None).count(), 0);
        assert_eq!(Relationships::from_value(Some(&json!("x"))).count(), 1);
        assert_eq!(Relationships::from_value(Some(&json!(42))).count(), 1);
    }

    #[test]
    fn test_format_entity_list() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);
        let response = json!({
            "totalCount": 18,
            "pageSize": 1,
            "nextPageKey": "next",
            "entities": [{
                "entityId": "HOST-0F66906C3BC01429",
                "type": "HOST",
                "displayName": "aks-ihudakpool-39785951-vmss00000O.cyat4o4idvyufoehozw0qdzzzzzz.internal.cloudapp.net",
                "tags": [
                    { "context": "CONTEXTLESS", "key": "env", "value": "prod" },
                    { "context": "CONTEXTLESS", "key": "critical" }
                ],
                "managementZones": [{ "id": "1", "name": "production" }]
            }]
        });

        let result = api.format_entity_list(&response);

        assert!(result.contains("Listing 1 of 18 entities"));
        assert!(result.contains("Not showing all matching entities"));
        assert!(result.contains("entityId: HOST-0F66906C3BC01429"));
        assert!(result.contains("displayName: aks-ihudakpool-39785951-vmss00000O.cyat4o4idvyufoehozw0qd..."));
        assert!(result.contains("type: HOST"));
        assert!(result.contains("tags: env:prod, critical"));
        assert!(result.contains("Management Zones: production"));
        assert!(result.contains("https://managed.test.com/e/abc123/"));
    }

    #[test]
    fn test_shows_all_retrieved_entities() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);
        let entities: Vec<Value> = (0..60)
            .map(|i| {
                json!({
                    "entityId": format!("ENTITY-{}", i),
                    "displayName": format!("Entity {}", i),
                    "entityType": "SERVICE",
                    "tags": [{ "context": "CONTEXTLESS", "key": "environment", "value": "production" }]
                })
            })
            .collect();
        let response = json!({ "totalCount": 100, "entities": entities });

        let result = api.format_entity_list(&response);

        assert!(result.contains("Listing 60 of 100 entities"));
        assert!(result.contains("Entity 0"));
        assert!(result.contains("Entity 59"));
        assert!(result.contains("type: SERVICE"));
    }

    #[test]
    fn test_tags_are_capped() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);
        let tags: Vec<Value> = (0..14).map(|i| json!({ "key": format!("k{}", i) })).collect();
        let response = json!({ "entities": [{ "entityId": "E-1", "tags": tags }] });

        let result = api.format_entity_list(&response);

        assert!(result.contains("k10 (+3 more)"));
        assert!(!result.contains("k11"));
    }

    #[test]
    fn test_empty_entity_lists() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);

        let result = api.format_entity_list(&json!({ "totalCount": 0, "entities": [] }));
        assert!(result.contains("Listing 0 entities."));
        assert!(result.contains("Verify that the filters"));

        let result = api.format_entity_list(&json!({}));
        assert!(result.contains("Listing 0 entities."));
        assert!(!result.contains("Not showing all"));
    }

    #[test]
    fn test_sparse_entity() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);

        let result = api.format_entity_list(&json!({ "entities": [{}] }));

        assert!(result.contains("Listing 1 entities."));
        assert!(result.contains("entityId: undefined"));
        assert!(result.contains("displayName: undefined"));
    }

    #[test]
    fn test_format_entity_type_list() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);
        let response = json!({
            "totalCount": 2,
            "types": [
                { "type": "APM_SECURITY_GATEWAY", "displayName": "ActiveGate" }
            ]
        });

        let result = api.format_entity_type_list(&response);

        assert!(result.contains("Listing 1 of 2 entity types"));
        assert!(result.contains("APM_SECURITY_GATEWAY - ActiveGate"));
        assert!(result.contains("Not showing all matching entity types"));
    }

    #[test]
    fn test_entity_type_list_calls_out_common_types() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);
        let response = json!({
            "types": [
                { "type": "HOST", "displayName": "Host" },
                { "type": "SERVICE", "displayName": "SERVICE" },
                { "type": "QUEUE", "displayName": "Queue" }
            ]
        });

        let result = api.format_entity_type_list(&response);

        assert!(result.contains("Common entity types include: HOST, SERVICE"));
        assert!(result.contains("\nSERVICE\n"));
        assert!(result.contains("QUEUE - Queue"));
    }

    #[test]
    fn test_sparse_entity_type_list() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);

        let result = api.format_entity_type_list(&json!({ "types": [{}] }));
        assert!(result.contains("Listing 1 entity types"));
        assert!(result.contains("undefined"));

        let result = api.format_entity_type_list(&json!({}));
        assert!(result.contains("Listing 0 entity types"));
    }

    #[test]
    fn test_format_details() {
        let transport = RecordingTransport::returning(Value::Null);
        let api = EntitiesApi::new(&transport);

        let result = api.format_entity_details(&json!({ "type": "SERVICE", "displayName": "Service" }));
        assert!(result.contains("Entity details in the following json"));
        assert!(result.contains("\"type\":\"SERVICE\""));
        assert!(result.contains("\"displayName\":\"Service\""));

        let result = api.format_entity_details(&json!({}));
        assert!(result.contains("{}"));

        let result = api.format_entity_type_details(&json!({}));
        assert!(result.contains("Entity type details in the following json"));
        assert!(result.contains("{}"));
    }
}
