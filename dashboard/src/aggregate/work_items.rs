use crate::context::ProjectContext;
use crate::errors::Result;
use crate::metrics_defs::ITEMS_DROPPED;
use crate::templates::{ITERATION_WORK_ITEMS, WIQL_URL, WORK_ITEM, WORK_ITEMS_BATCH};
use azure_client::DevOpsClient;
use azure_client::models::{
    IterationWorkItems, ListResponse, WiqlResult, WorkItem, WorkItemsBatchRequest,
};
use regex::Regex;
use serde::Serialize;
use shared::counter;
use std::sync::LazyLock;

/// Fields requested from the batch endpoint for sprint boards.
const ITERATION_FIELDS: &[&str] = &[
    "System.Id",
    "System.Title",
    "System.State",
    "System.AssignedTo",
    "System.AreaPath",
    "System.IterationPath",
    "System.WorkItemType",
];

/// Most ids the batch endpoint accepts in one request.
const MAX_BATCH_IDS: usize = 200;

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(.*?)""#).expect("valid regex"));

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IterationWorkItem {
    pub id: u64,
    pub title: Option<String>,
    pub state: Option<String>,
    pub assigned_to: Option<String>,
    pub area_path: Option<String>,
    pub iteration_path: Option<String>,
    pub work_item_type: Option<String>,
}

impl From<WorkItem> for IterationWorkItem {
    fn from(item: WorkItem) -> Self {
        let fields = item.fields;
        IterationWorkItem {
            id: item.id,
            assigned_to: fields
                .assigned_to
                .as_ref()
                .and_then(|a| a.display_name())
                .map(String::from),
            title: fields.title,
            state: fields.state,
            area_path: fields.area_path,
            iteration_path: fields.iteration_path,
            work_item_type: fields.work_item_type,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePlanWorkItem {
    pub id: u64,
    pub title: Option<String>,
    pub state: Option<String>,
    pub web_url: Option<String>,
    pub updates_url: Option<String>,
    pub release_notes_url: Option<String>,
    pub pm_approval_to_production: Option<serde_json::Value>,
    pub dev_approval_to_staging: Option<serde_json::Value>,
    pub se_approval_to_production: Option<serde_json::Value>,
    pub approval_to_staging: Option<serde_json::Value>,
}

impl From<WorkItem> for ReleasePlanWorkItem {
    fn from(item: WorkItem) -> Self {
        let fields = item.fields;
        let links = item.links.unwrap_or_default();
        ReleasePlanWorkItem {
            id: item.id,
            release_notes_url: fields.release_notes.as_deref().and_then(first_href),
            title: fields.title,
            state: fields.state,
            web_url: links.html.map(|link| link.href),
            updates_url: links.work_item_updates.map(|link| link.href),
            pm_approval_to_production: fields.pm_approval_to_production,
            dev_approval_to_staging: fields.dev_approval_to_staging,
            se_approval_to_production: fields.se_approval_to_production,
            approval_to_staging: fields.approval_to_staging,
        }
    }
}

/// The first `href="..."` target in an HTML fragment.
pub fn first_href(html: &str) -> Option<String> {
    HREF.captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Work item ids mentioned by a sprint's relations, first seen first.
fn relation_ids(relations: &IterationWorkItems) -> Vec<u64> {
    let mut ids = Vec::new();
    let endpoints = relations
        .work_item_relations
        .iter()
        .flat_map(|relation| [relation.source.as_ref(), relation.target.as_ref()])
        .flatten();
    for endpoint in endpoints {
        if !ids.contains(&endpoint.id) {
            ids.push(endpoint.id);
        }
    }
    ids
}

/// Every work item on a sprint's board.
pub async fn iteration_work_items(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    iteration_id: &str,
) -> Result<Vec<IterationWorkItem>> {
    let url = ctx.url(ITERATION_WORK_ITEMS, &[("iterationId", iteration_id)])?;
    let relations: IterationWorkItems = client.get_json(ITERATION_WORK_ITEMS, &url).await?;

    let ids = relation_ids(&relations);
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let url = ctx.url(WORK_ITEMS_BATCH, &[])?;
    let mut items = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_BATCH_IDS) {
        let body = WorkItemsBatchRequest {
            ids: chunk,
            fields: ITERATION_FIELDS,
        };
        let batch: ListResponse<WorkItem> =
            client.post_json(WORK_ITEMS_BATCH, &url, &body).await?;
        items.extend(batch.value.into_iter().map(IterationWorkItem::from));
    }

    Ok(items)
}

/// Work items returned by the project's saved release-plan query, in query
/// order. Items whose detail cannot be fetched are skipped.
pub async fn release_plan_work_items(
    client: &DevOpsClient,
    ctx: &ProjectContext,
) -> Result<Vec<ReleasePlanWorkItem>> {
    let url = ctx.url(WIQL_URL, &[])?;
    let result: WiqlResult = client.get_json(WIQL_URL, &url).await?;

    let mut items = Vec::with_capacity(result.work_items.len());
    for reference in result.work_items {
        match client.get_json::<WorkItem>(WORK_ITEM, &reference.url).await {
            Ok(item) => items.push(ReleasePlanWorkItem::from(item)),
            Err(e) => {
                tracing::warn!(work_item = reference.id, error = %e, "Skipping work item");
                counter!(ITEMS_DROPPED, "aggregation" => "release_plan").increment(1);
            }
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DashboardError;
    use crate::testutils::{client, mock_context};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ITERATION_PATH: &str =
        "/org/proj/CHMP-Team/_apis/work/teamsettings/iterations/it-1/workitems";
    const BATCH_PATH: &str = "/org/proj/_apis/wit/workitemsbatch";

    #[test]
    fn test_first_href() {
        assert_eq!(
            first_href(r#"<div><a href="https://wiki/notes">notes</a> <a href="https://b">b</a></div>"#),
            Some("https://wiki/notes".to_string())
        );
        assert_eq!(first_href("<div>no link</div>"), None);
        assert_eq!(first_href(""), None);
    }

    #[tokio::test]
    async fn test_iteration_work_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ITERATION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workItemRelations": [
                    {"rel": null, "source": null, "target": {"id": 10}},
                    {"rel": "System.LinkTypes.Hierarchy-Forward", "source": {"id": 10}, "target": {"id": 11}},
                    {"rel": "System.LinkTypes.Hierarchy-Forward", "source": {"id": 10}, "target": {"id": 12}}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(BATCH_PATH))
            .and(body_json(json!({"ids": [10, 11, 12], "fields": ITERATION_FIELDS})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "value": [
                    {"id": 10, "fields": {
                        "System.Title": "Feature",
                        "System.State": "Active",
                        "System.AssignedTo": {"displayName": "Jane Doe", "uniqueName": "jane@example.com"},
                        "System.AreaPath": "CHMP",
                        "System.IterationPath": "CHMP\\Sprint 1",
                        "System.WorkItemType": "Feature"
                    }},
                    {"id": 11, "fields": {"System.Title": "Task", "System.AssignedTo": "User2"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = iteration_work_items(&client(), &mock_context(&server.uri()), "it-1")
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            IterationWorkItem {
                id: 10,
                title: Some("Feature".into()),
                state: Some("Active".into()),
                assigned_to: Some("Jane Doe".into()),
                area_path: Some("CHMP".into()),
                iteration_path: Some("CHMP\\Sprint 1".into()),
                work_item_type: Some("Feature".into()),
            }
        );
        assert_eq!(items[1].assigned_to.as_deref(), Some("User2"));
        assert_eq!(items[1].state, None);
    }

    #[tokio::test]
    async fn test_large_iteration_is_fetched_in_batches() {
        let server = MockServer::start().await;
        let relations: Vec<_> = (1..=201u64)
            .map(|id| json!({"rel": null, "source": null, "target": {"id": id}}))
            .collect();
        Mock::given(method("GET"))
            .and(path(ITERATION_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"workItemRelations": relations})),
            )
            .mount(&server)
            .await;

        let first: Vec<u64> = (1..=200).collect();
        Mock::given(method("POST"))
            .and(path(BATCH_PATH))
            .and(body_json(json!({"ids": first, "fields": ITERATION_FIELDS})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "value": [{"id": 1, "fields": {"System.Title": "First"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(BATCH_PATH))
            .and(body_json(json!({"ids": [201], "fields": ITERATION_FIELDS})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "value": [{"id": 201, "fields": {"System.Title": "Last"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = iteration_work_items(&client(), &mock_context(&server.uri()), "it-1")
            .await
            .unwrap();
        let ids: Vec<u64> = items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![1, 201]);
    }

    #[tokio::test]
    async fn test_empty_iteration_skips_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ITERATION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"workItemRelations": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(BATCH_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let items = iteration_work_items(&client(), &mock_context(&server.uri()), "it-1")
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_release_plan_work_items() {
        let server = MockServer::start().await;
        let mut ctx = mock_context(&server.uri());
        ctx.templates.urls.insert(
            WIQL_URL.to_string(),
            format!("{}/org/proj/_apis/wit/wiql/q-1?api-version=7.1", server.uri()).into(),
        );

        Mock::given(method("GET"))
            .and(path("/org/proj/_apis/wit/wiql/q-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workItems": [
                    {"id": 1, "url": format!("{}/items/1", server.uri())},
                    {"id": 2, "url": format!("{}/items/2", server.uri())}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "fields": {
                    "System.Title": "Login page",
                    "System.State": "Closed",
                    "Custom.ReleaseNotes": "<div><a href=\"https://wiki/notes/1\">Notes</a></div>",
                    "Custom.PMApprovaltoProduction": true,
                    "Custom.ApprovaltoStaging": "Approved"
                },
                "_links": {
                    "html": {"href": "https://web/1"},
                    "workItemUpdates": {"href": "https://api/1/updates"}
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items/2"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let items = release_plan_work_items(&client(), &ctx).await.unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.id, 1);
        assert_eq!(item.web_url.as_deref(), Some("https://web/1"));
        assert_eq!(item.updates_url.as_deref(), Some("https://api/1/updates"));
        assert_eq!(item.release_notes_url.as_deref(), Some("https://wiki/notes/1"));
        assert_eq!(item.pm_approval_to_production, Some(json!(true)));
        assert_eq!(item.approval_to_staging, Some(json!("Approved")));
        assert_eq!(item.dev_approval_to_staging, None);
    }

    #[tokio::test]
    async fn test_release_plan_query_failure() {
        // Nothing mounted, every request is answered with 404
        let server = MockServer::start().await;

        let err = release_plan_work_items(&client(), &mock_context(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Upstream(_)));
    }
}
