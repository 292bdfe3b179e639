//! Graph-backed directory and end-to-end bulk runs against a mock server

use dirbulk::bulk::decision::PendingRow;
use dirbulk::bulk::input::parse_records;
use dirbulk::bulk::{
    Decider, Decision, Mode, Outcome, ProxyAddressRule, RowProcessor, SkipReason, UpdateRule,
    UpnRule,
};
use dirbulk::directory::{AccountId, Attribute, AttributePatch, Directory, DirectoryUser};
use dirbulk::error::{DirbulkError, Result};
use dirbulk::graph::GraphClient;
use dirbulk::graph::exchange::ExchangeAdmin;
use dirbulk::graph::users::GraphDirectory;
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{body_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, GraphDirectory) {
    let server = MockServer::start().await;
    let client = GraphClient::with_base_url("test-token".into(), &format!("{}/v1.0", server.uri()));
    (server, GraphDirectory::new(client))
}

fn exchange_for(server: &MockServer) -> ExchangeAdmin {
    ExchangeAdmin::new(GraphClient::with_base_url(
        "exchange-token".into(),
        &format!("{}/adminapi/beta/tid", server.uri()),
    ))
}

fn cloud_user(id: &str, upn: &str) -> DirectoryUser {
    DirectoryUser {
        id: id.into(),
        user_principal_name: upn.into(),
        display_name: None,
        mail: None,
        proxy_addresses: vec![format!("SMTP:{}", upn)],
        on_premises_sam_account_name: None,
        on_premises_sync_enabled: None,
    }
}

/// Decider for batch runs; being asked is a test failure
struct NeverAsked;

impl Decider for NeverAsked {
    fn decide(&mut self, row: &PendingRow<'_>) -> Result<Decision> {
        panic!("unexpected prompt for line {}", row.record.line);
    }
}

#[tokio::test]
async fn test_find_by_upn() {
    let (server, directory) = setup().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1\.0/users/alice(%40|@)contoso\.com$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "userPrincipalName": "alice@contoso.com",
            "displayName": "Alice",
            "mail": "alice@contoso.com",
            "proxyAddresses": ["SMTP:alice@contoso.com"],
            "onPremisesSamAccountName": "alice"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = directory
        .find_user(&AccountId::UserPrincipalName("alice@contoso.com".into()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.id, "u1");
    assert_eq!(user.proxy_addresses, vec!["SMTP:alice@contoso.com"]);
}

#[tokio::test]
async fn test_find_by_upn_not_found() {
    let (server, directory) = setup().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1\.0/users/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "Request_ResourceNotFound", "message": "not found" }
        })))
        .mount(&server)
        .await;

    let user = directory
        .find_user(&AccountId::UserPrincipalName("ghost@contoso.com".into()))
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_find_by_sam_uses_advanced_query() {
    let (server, directory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .and(header("ConsistencyLevel", "eventual"))
        .and(query_param("$count", "true"))
        .and(query_param("$filter", "onPremisesSamAccountName eq 'o''brien'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": "u7", "userPrincipalName": "obrien@contoso.com" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = directory
        .find_user(&AccountId::SamAccountName("o'brien".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.id, "u7");
    assert!(user.proxy_addresses.is_empty());
}

#[tokio::test]
async fn test_find_by_sam_ambiguous_is_error() {
    let (server, directory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "id": "u1", "userPrincipalName": "a@contoso.com" },
                { "id": "u2", "userPrincipalName": "a@fabrikam.com" }
            ]
        })))
        .mount(&server)
        .await;

    let err = directory
        .find_user(&AccountId::SamAccountName("alice".into()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("2 users"));
}

#[tokio::test]
async fn test_update_user_patches_attributes() {
    let (server, directory) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/v1.0/users/u1"))
        .and(body_json(json!({ "userPrincipalName": "a@new.com" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut patch = AttributePatch::new();
    patch.set(Attribute::UserPrincipalName, json!("a@new.com"));
    directory
        .update_user(&cloud_user("u1", "a@old.com"), &patch)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_address_change_goes_to_set_mailbox() {
    let (server, directory) = setup().await;
    let directory = directory.with_exchange(exchange_for(&server));

    Mock::given(method("POST"))
        .and(path("/adminapi/beta/tid/InvokeCommand"))
        .and(header("Authorization", "Bearer exchange-token"))
        .and(body_json(json!({
            "CmdletInput": {
                "CmdletName": "Set-Mailbox",
                "Parameters": {
                    "Identity": "a@old.com",
                    "EmailAddresses": ["SMTP:a@new.com", "smtp:a@old.com"],
                    "WindowsEmailAddress": "a@new.com"
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v1.0/users/u1"))
        .and(body_json(json!({ "userPrincipalName": "a@new.com" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut patch = AttributePatch::new();
    patch.set(Attribute::UserPrincipalName, json!("a@new.com"));
    patch.set(Attribute::ProxyAddresses, json!(["SMTP:a@new.com", "smtp:a@old.com"]));
    patch.set(Attribute::Mail, json!("a@new.com"));
    directory
        .update_user(&cloud_user("u1", "a@old.com"), &patch)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_address_change_without_exchange_is_refused() {
    let (server, directory) = setup().await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(400))
        .expect(0)
        .mount(&server)
        .await;

    let mut patch = AttributePatch::new();
    patch.set(Attribute::ProxyAddresses, json!(["SMTP:a@new.com"]));
    let err = directory
        .update_user(&cloud_user("u1", "a@old.com"), &patch)
        .await
        .unwrap_err();

    assert!(matches!(err, DirbulkError::UnsupportedWrite { .. }));
    assert!(err.to_string().contains("Exchange Online"));
}

#[tokio::test]
async fn test_synced_user_is_refused_before_any_write() {
    let (server, directory) = setup().await;
    let directory = directory.with_exchange(exchange_for(&server));

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let mut user = cloud_user("u1", "a@old.com");
    user.on_premises_sync_enabled = Some(true);
    let mut patch = AttributePatch::new();
    patch.set(Attribute::ProxyAddresses, json!(["SMTP:a@new.com"]));

    let err = directory.update_user(&user, &patch).await.unwrap_err();
    assert!(err.to_string().contains("on-premises AD"));
}

#[tokio::test]
async fn test_proxy_run_writes_through_exchange() {
    let (server, directory) = setup().await;
    let directory = directory.with_exchange(exchange_for(&server));

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "u1",
                "userPrincipalName": "alice@contoso.com",
                "proxyAddresses": ["SMTP:alice@contoso.com"],
                "onPremisesSyncEnabled": null
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/adminapi/beta/tid/InvokeCommand"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(400))
        .expect(0)
        .mount(&server)
        .await;

    let rule = ProxyAddressRule::default();
    let csv = "SamAccountName,PrimarySmtpAddress
               alice,alice@fabrikam.com
";
    let records = parse_records(csv.as_bytes(), Path::new("proxy.csv"), rule.schema()).unwrap();

    let summary = RowProcessor::new(&directory, &rule, Mode::Batch)
        .process(&records, &mut NeverAsked)
        .await;

    assert_eq!((summary.applied, summary.failed), (1, 0));
}

#[tokio::test]
async fn test_upn_run_applies_and_continues_past_missing_user() {
    let (server, directory) = setup().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1\.0/users/alice(%40|@)old\.com$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "userPrincipalName": "alice@old.com"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1\.0/users/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v1.0/users/u1"))
        .and(body_json(json!({ "userPrincipalName": "alice@new.com" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let csv = "UserPrincipalName,NewUPN\n\
               ghost@old.com,ghost@new.com\n\
               alice@old.com,alice@new.com\n\
               bob@old.com,\n";
    let records = parse_records(csv.as_bytes(), Path::new("upn.csv"), UpnRule.schema()).unwrap();

    let summary = RowProcessor::new(&directory, &UpnRule, Mode::Batch)
        .process(&records, &mut NeverAsked)
        .await;

    assert_eq!((summary.applied, summary.failed, summary.skipped), (1, 1, 1));
    assert_eq!(summary.rows[0].line, 2);
    assert!(matches!(summary.rows[0].outcome, Outcome::Failed(_)));
}

#[tokio::test]
async fn test_proxy_run_with_equivalent_set_never_writes() {
    let (server, directory) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "u1",
                "userPrincipalName": "alice@contoso.com",
                "proxyAddresses": [
                    "X500:/o=Contoso/cn=alice",
                    "smtp:ALICE@fabrikam.com",
                    "SMTP:Alice@Contoso.com"
                ]
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let rule = ProxyAddressRule::default();
    let csv = "SamAccountName,PrimarySmtpAddress,SecondarySmtpAddress\n\
               alice,alice@contoso.com,alice@fabrikam.com\n";
    let records = parse_records(csv.as_bytes(), Path::new("proxy.csv"), rule.schema()).unwrap();

    let summary = RowProcessor::new(&directory, &rule, Mode::Prompting)
        .process(&records, &mut NeverAsked)
        .await;

    assert_eq!(summary.applied, 0);
    assert_eq!(
        summary.rows[0].outcome,
        Outcome::Skipped(SkipReason::NoChange)
    );
}
