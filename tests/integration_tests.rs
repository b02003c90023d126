use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use table_batch_rs::core::protocol::property_codec::{decode, encode, infer};
use table_batch_rs::{
    CodecConfig, ContentKey, DynamicEntity, EncryptionPolicy, EntityProperty, Result,
    TableBatch, TableCodec, TableError, TableOperation, TableRequest, TableRequestOptions,
    TableResponse, TableTransport,
};
use uuid::Uuid;

fn codec() -> TableCodec {
    TableCodec::new(CodecConfig::new(
        "https://acct.table.core.windows.net",
        "people",
    ))
}

fn body_text(codec: &TableCodec, batch: &TableBatch) -> String {
    let formatted = codec
        .serialize_batch(batch, &TableRequestOptions::default())
        .unwrap();
    String::from_utf8(formatted.body.to_vec()).unwrap()
}

fn part(status: &str, headers: &[&str], body: Option<&str>) -> String {
    let mut text = String::from(
        "--changesetresponse_77\r\nContent-Type: application/http\r\nContent-Transfer-Encoding: binary\r\n\r\n",
    );
    text.push_str(&format!("HTTP/1.1 {}\r\n", status));
    for header in headers {
        text.push_str(header);
        text.push_str("\r\n");
    }
    text.push_str("\r\n");
    if let Some(body) = body {
        text.push_str(body);
        text.push_str("\r\n");
    }
    text
}

fn changeset_response(parts: &[String]) -> String {
    let mut text = String::from(
        "--batchresponse_42\r\nContent-Type: multipart/mixed; boundary=changesetresponse_77\r\n\r\n",
    );
    for p in parts {
        text.push_str(p);
    }
    text.push_str("--changesetresponse_77--\r\n--batchresponse_42--\r\n");
    text
}

/// XOR "cipher" keyed by the content key and the property context.
struct XorPolicy;

impl XorPolicy {
    fn apply(key: &ContentKey, context: &str, data: &[u8]) -> Vec<u8> {
        let pad: Vec<u8> = key
            .as_bytes()
            .iter()
            .chain(context.as_bytes())
            .copied()
            .collect();
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ pad[i % pad.len()])
            .collect()
    }
}

impl EncryptionPolicy for XorPolicy {
    fn should_encrypt(&self, _pk: &str, _rk: &str, property: &str) -> bool {
        property == "Secret"
    }

    fn generate_key(&self) -> Result<(ContentKey, String)> {
        Ok((ContentKey::new(vec![3, 5, 9]), "k1".to_string()))
    }

    fn unwrap_key(&self, key_details: &str) -> Result<ContentKey> {
        match key_details {
            "k1" => Ok(ContentKey::new(vec![3, 5, 9])),
            other => Err(TableError::Encryption(format!("unknown key {}", other))),
        }
    }

    fn encrypt(&self, key: &ContentKey, context: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(Self::apply(key, context, plaintext))
    }

    fn decrypt(&self, key: &ContentKey, context: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(Self::apply(key, context, ciphertext))
    }
}

/// Records the request and answers with a canned response.
struct InMemoryTransport {
    response: TableResponse,
    sent: Mutex<Vec<TableRequest>>,
}

#[async_trait]
impl TableTransport for InMemoryTransport {
    async fn send(&self, request: TableRequest) -> Result<TableResponse> {
        self.sent.lock().unwrap().push(request);
        Ok(self.response.clone())
    }
}

#[test]
fn test_property_round_trip() {
    let datetime: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-05-06T07:08:09.1234567Z")
        .unwrap()
        .with_timezone(&Utc);
    let values = [
        EntityProperty::String("plain".into()),
        EntityProperty::Binary(vec![0, 1, 2, 254, 255]),
        EntityProperty::Boolean(true),
        EntityProperty::DateTime(datetime),
        EntityProperty::Double(2.5),
        EntityProperty::Guid(Uuid::parse_str("c9da6455-213d-42c9-9a79-3e9149a57833").unwrap()),
        EntityProperty::Int32(-17),
        EntityProperty::Int64(9_007_199_254_740_993),
    ];

    for value in values {
        let (wire, annotation) = encode(&value).unwrap();
        let edm_type = annotation.unwrap_or_else(|| infer(&wire));
        assert_eq!(decode("p", &wire, edm_type).unwrap(), value);
    }
}

#[test]
fn test_results_keep_request_order() {
    let codec = codec();
    let mut batch = TableBatch::new();
    for rk in ["a", "b", "c"] {
        batch
            .push(TableOperation::insert(DynamicEntity::new("p", rk), false))
            .unwrap();
    }
    let response = changeset_response(&[
        part("204 No Content", &["ETag: W/\"1\""], None),
        part("204 No Content", &["ETag: W/\"2\""], None),
        part("204 No Content", &["ETag: W/\"3\""], None),
    ]);

    let results = codec
        .parse_batch_response(
            Cursor::new(response.as_bytes()),
            &mut batch,
            &TableRequestOptions::default(),
        )
        .unwrap();
    let etags: Vec<_> = results.iter().map(|r| r.etag.as_deref().unwrap()).collect();
    assert_eq!(etags, ["W/\"1\"", "W/\"2\"", "W/\"3\""]);
    assert_eq!(batch.get(2).unwrap().entity().etag.as_deref(), Some("W/\"3\""));
}

#[test]
fn test_retrieve_not_found_is_a_result() {
    let codec = codec();
    let mut batch = TableBatch::new()
        .with(TableOperation::retrieve("p", "gone").unwrap())
        .unwrap();
    let response = "--batchresponse_42\r\n\
        Content-Type: application/http\r\n\
        Content-Transfer-Encoding: binary\r\n\
        \r\n\
        HTTP/1.1 404 Not Found\r\n\
        Content-Type: application/json;odata=minimalmetadata\r\n\
        \r\n\
        {\"odata.error\":{\"code\":\"ResourceNotFound\",\"message\":{\"lang\":\"en-US\",\"value\":\"Not found\"}}}\r\n\
        --batchresponse_42--\r\n";

    let results = codec
        .parse_batch_response(
            Cursor::new(response.as_bytes()),
            &mut batch,
            &TableRequestOptions::default(),
        )
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, 404);
    assert!(!results[0].has_entity());
}

#[test]
fn test_conflict_names_failing_index() {
    let codec = codec();
    let mut batch = TableBatch::new();
    for rk in ["0", "1", "2"] {
        batch
            .push(TableOperation::insert(DynamicEntity::new("p", rk), false))
            .unwrap();
    }
    // The service answers a failed changeset with the failing part only.
    let response = changeset_response(&[part(
        "409 Conflict",
        &["Content-Type: application/json;odata=minimalmetadata"],
        Some(
            r#"{"odata.error":{"code":"EntityAlreadyExists","message":{"lang":"en-US","value":"1:The specified entity already exists."}}}"#,
        ),
    )]);

    let err = codec
        .parse_batch_response(
            Cursor::new(response.as_bytes()),
            &mut batch,
            &TableRequestOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.failed_index(), Some(1));
    assert_eq!(err.status(), Some(409));
    assert!(!err.is_retryable());
    match err {
        TableError::BatchOperationFailed { code, message, .. } => {
            assert_eq!(code.as_deref(), Some("EntityAlreadyExists"));
            assert_eq!(message, "The specified entity already exists.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(batch.iter().all(|op| op.entity().etag.is_none()));
}

#[test]
fn test_single_retrieve_omits_changeset() {
    let codec = codec();
    let query = TableBatch::new()
        .with(TableOperation::retrieve("p", "1").unwrap())
        .unwrap();
    let text = body_text(&codec, &query);
    assert_eq!(text.matches("--batch_").count(), 2);
    assert!(!text.contains("changeset_"));
    assert!(text.contains(
        "GET https://acct.table.core.windows.net/people(PartitionKey='p',RowKey='1') HTTP/1.1"
    ));

    let single_insert = TableBatch::new()
        .with(TableOperation::insert(DynamicEntity::new("p", "1"), false))
        .unwrap();
    let text = body_text(&codec, &single_insert);
    assert!(text.contains("--batch_"));
    assert!(text.contains("--changeset_"));
}

#[test]
fn test_percent_in_key_is_not_double_escaped() {
    let codec = codec();
    let batch = TableBatch::new()
        .with(TableOperation::delete(DynamicEntity::new("p", "50%off").with_etag("*")).unwrap())
        .unwrap();
    let text = body_text(&codec, &batch);
    assert!(text.contains("RowKey='50%off')"));
    assert!(!text.contains("%25"));
}

#[test]
fn test_merge_with_encryption_is_rejected() {
    let codec = codec();
    let options = TableRequestOptions::new().with_encryption_policy(Arc::new(XorPolicy));
    for op in [
        TableOperation::merge(DynamicEntity::new("p", "1").with_etag("*")).unwrap(),
        TableOperation::insert_or_merge(DynamicEntity::new("p", "1")).unwrap(),
    ] {
        let batch = TableBatch::new().with(op).unwrap();
        let err = codec.serialize_batch(&batch, &options).unwrap_err();
        assert!(matches!(err, TableError::EncryptionPolicyViolation(_)));
    }
}

#[test]
fn test_encrypted_entity_reads_back() {
    let codec = codec();
    let options = TableRequestOptions::new().with_encryption_policy(Arc::new(XorPolicy));
    let insert = TableOperation::insert(
        DynamicEntity::new("p", "1")
            .with_property("Name", "Ada")
            .with_property("Secret", "hunter2"),
        false,
    );

    let body = codec.serialize_entity(&insert, &options).unwrap();
    let json = String::from_utf8(body.to_vec()).unwrap();
    assert!(!json.contains("hunter2"));
    assert!(json.contains("_ClientEncryptionMetadata1"));

    let mut batch = TableBatch::new()
        .with(TableOperation::retrieve("p", "1").unwrap())
        .unwrap();
    let response = format!(
        "--batchresponse_42\r\n\
         Content-Type: application/http\r\n\
         Content-Transfer-Encoding: binary\r\n\
         \r\n\
         HTTP/1.1 200 OK\r\n\
         Content-Type: application/json;odata=minimalmetadata\r\n\
         ETag: W/\"x\"\r\n\
         \r\n\
         {}\r\n\
         --batchresponse_42--\r\n",
        json
    );

    let mut results = codec
        .parse_batch_response(Cursor::new(response.as_bytes()), &mut batch, &options)
        .unwrap();
    let entity = results[0].take_entity::<DynamicEntity>().unwrap();
    assert_eq!(entity.property("Secret").and_then(|p| p.as_str()), Some("hunter2"));
    assert_eq!(entity.property("Name").and_then(|p| p.as_str()), Some("Ada"));
    assert!(entity.property("_ClientEncryptionMetadata2").is_none());
}

#[test]
fn test_insert_and_delete_scenario() {
    let codec = codec();
    let mut batch = TableBatch::new()
        .with(TableOperation::insert(
            DynamicEntity::new("p", "1").with_property("x", 5),
            true,
        ))
        .unwrap()
        .with(TableOperation::delete(DynamicEntity::new("p", "2").with_etag("W/\"A\"")).unwrap())
        .unwrap();

    let text = body_text(&codec, &batch);
    let lines: Vec<&str> = text.split("\r\n").collect();
    let post = lines
        .iter()
        .position(|l| *l == "POST https://acct.table.core.windows.net/people HTTP/1.1")
        .unwrap();
    let delete = lines
        .iter()
        .position(|l| {
            *l == "DELETE https://acct.table.core.windows.net/people(PartitionKey='p',RowKey='2') HTTP/1.1"
        })
        .unwrap();
    assert!(post < delete);
    assert!(lines[post..delete].contains(&r#"{"PartitionKey":"p","RowKey":"1","x":5}"#));
    assert!(lines[delete..].contains(&"If-Match: W/\"A\""));
    assert!(!lines[delete..].iter().any(|l| l.starts_with('{')));

    let response = changeset_response(&[
        part(
            "201 Created",
            &[
                "Content-Type: application/json;odata=minimalmetadata",
                "ETag: W/\"e1\"",
            ],
            Some(r#"{"PartitionKey":"p","RowKey":"1","Timestamp":"2024-01-02T03:04:05Z","x":5}"#),
        ),
        part("204 No Content", &["ETag: W/\"e2\""], None),
    ]);
    let results = codec
        .parse_batch_response(
            Cursor::new(response.as_bytes()),
            &mut batch,
            &TableRequestOptions::default(),
        )
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, 201);
    assert_eq!(results[0].etag.as_deref(), Some("W/\"e1\""));
    assert_eq!(results[1].status, 204);
    assert_eq!(results[1].etag.as_deref(), Some("W/\"e2\""));
}

#[tokio::test]
async fn test_execute_batch_through_transport() {
    let codec = codec();
    let mut batch = TableBatch::new()
        .with(TableOperation::insert(DynamicEntity::new("p", "1"), false))
        .unwrap()
        .with(TableOperation::replace(DynamicEntity::new("p", "2").with_etag("W/\"B\"")).unwrap())
        .unwrap();

    let response_body = changeset_response(&[
        part(
            "204 No Content",
            &["ETag: W/\"datetime'2024-05-06T07%3A08%3A09.1234567Z'\""],
            None,
        ),
        part("204 No Content", &["ETag: W/\"r2\""], None),
    ]);
    let transport = InMemoryTransport {
        response: TableResponse::new(202, response_body)
            .with_header("Content-Type", "multipart/mixed; boundary=batchresponse_42"),
        sent: Mutex::new(Vec::new()),
    };

    let results = codec
        .execute_batch(&transport, &mut batch, &TableRequestOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let inserted = batch.get(0).unwrap().entity();
    assert_eq!(
        inserted.timestamp.map(|t| t.to_rfc3339()).as_deref(),
        Some("2024-05-06T07:08:09.123456700+00:00")
    );
    assert_eq!(batch.get(1).unwrap().entity().etag.as_deref(), Some("W/\"r2\""));

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].uri, "https://acct.table.core.windows.net/$batch");
    assert!(sent[0]
        .header("Content-Type")
        .unwrap()
        .starts_with("multipart/mixed; boundary=batch_"));
}

#[tokio::test]
async fn test_execute_batch_reports_transport_error() {
    struct Down;

    #[async_trait]
    impl TableTransport for Down {
        async fn send(&self, _request: TableRequest) -> Result<TableResponse> {
            Err(TableError::Transport("connection refused".into()))
        }
    }

    let mut batch = TableBatch::new()
        .with(TableOperation::insert(DynamicEntity::new("p", "1"), false))
        .unwrap();
    let err = codec()
        .execute_batch(&Down, &mut batch, &TableRequestOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}
