//! Integration tests for the CloudWatch Logs client against a canned HTTP server.

use hmac::{Hmac, Mac};
use lt_cloudwatch::{Client, Credentials};
use sha2::{Digest, Sha256};
use lt_core::{ContinuationToken, LogBackend, LogSourceName, StreamName};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as seen by the fake server.
#[derive(Debug)]
struct Captured {
    head: String,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// Recomputes the SigV4 signature from the request as received, the way the
/// service does, and compares it with the one in the `authorization` header.
fn signature_matches(request: &Captured, secret: &str) -> bool {
    fn hmac(key: &[u8], data: &str) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
        mac.update(data.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    let authorization = request.header("authorization").unwrap();
    let field = |name: &str| {
        authorization
            .split([' ', ','])
            .find_map(|part| part.strip_prefix(name))
            .unwrap()
    };
    let scope = field("Credential=").split_once('/').unwrap().1;
    let signed_headers = field("SignedHeaders=");
    let signature = field("Signature=");

    let path = request.head.split(' ').nth(1).unwrap();
    let canonical_headers: String = signed_headers
        .split(';')
        .map(|name| format!("{name}:{}\n", request.header(name).unwrap()))
        .collect();
    let canonical = format!(
        "POST\n{path}\n\n{canonical_headers}\n{signed_headers}\n{}",
        hex::encode(Sha256::digest(request.body.as_bytes()))
    );
    let to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{scope}\n{}",
        request.header("x-amz-date").unwrap(),
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let mut key = format!("AWS4{secret}").into_bytes();
    for part in scope.split('/') {
        key = hmac(&key, part);
    }
    hex::encode(hmac(&key, &to_sign)) == signature
}

/// Serves one HTTP response per scripted entry, capturing each request.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            captured.push(read_request(&mut socket).await);

            let reason = if status == 200 { "OK" } else { "Bad Request" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\n\
                 content-type: application/x-amz-json-1.1\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        captured
    });

    (endpoint, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed connection early");
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(split) = text.find("\r\n\r\n") {
            let head = text[..split].to_string();
            let length = head
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().unwrap())
                })
                .unwrap_or(0);
            let body_start = split + 4;
            if buffer.len() >= body_start + length {
                let body = String::from_utf8_lossy(&buffer[body_start..body_start + length])
                    .to_string();
                return Captured { head, body };
            }
        }
    }
}

fn client(endpoint: &str) -> Client {
    let credentials = Credentials::new("AKIDEXAMPLE", "secret", Some("session".to_string())).unwrap();
    Client::with_endpoint(credentials, "us-east-1", endpoint).unwrap()
}

fn source() -> LogSourceName {
    LogSourceName::new("/aws/lambda/svc-a").unwrap()
}

#[tokio::test]
async fn list_latest_streams_sends_signed_describe_request() {
    let (endpoint, server) = serve(vec![(
        200,
        r#"{"logStreams":[{"logStreamName":"2024/01/01/[$LATEST]s1","lastEventTimestamp":1704067200000}]}"#,
    )])
    .await;

    let streams = client(&endpoint)
        .list_latest_streams(&source(), 1)
        .await
        .unwrap();

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].name.as_str(), "2024/01/01/[$LATEST]s1");
    assert!(streams[0].last_event_at.is_some());

    let requests = server.await.unwrap();
    let request = &requests[0];
    assert!(request.head.starts_with("POST / HTTP/1.1"));
    assert!(signature_matches(request, "secret"));
    assert_eq!(
        request.header("x-amz-target"),
        Some("Logs_20140328.DescribeLogStreams")
    );
    assert_eq!(request.header("x-amz-security-token"), Some("session"));
    assert!(
        request
            .header("authorization")
            .unwrap()
            .starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/")
    );
    assert_eq!(
        request.body,
        r#"{"logGroupName":"/aws/lambda/svc-a","orderBy":"LastEventTime","descending":true,"limit":1}"#
    );
}

#[tokio::test]
async fn missing_log_group_maps_to_not_found() {
    let (endpoint, server) = serve(vec![(
        400,
        r#"{"__type":"ResourceNotFoundException","message":"The specified log group does not exist."}"#,
    )])
    .await;

    let err = client(&endpoint)
        .list_latest_streams(&source(), 1)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    server.await.unwrap();
}

#[tokio::test]
async fn get_events_passes_token_and_returns_forward_token() {
    let (endpoint, server) = serve(vec![(
        200,
        r#"{"events":[{"timestamp":1,"message":"hello\n","ingestionTime":5},{"timestamp":2,"message":"world  ","ingestionTime":6}],"nextForwardToken":"f/2","nextBackwardToken":"b/1"}"#,
    )])
    .await;

    let stream = StreamName::new("2024/01/01/s1").unwrap();
    let token = ContinuationToken::new("f/1").unwrap();
    let page = client(&endpoint)
        .get_events(&source(), &stream, Some(&token))
        .await
        .unwrap();

    let lines: Vec<String> = page.events.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "1970-01-01T00:00:00.001Z hello",
            "1970-01-01T00:00:00.002Z world"
        ]
    );
    assert_eq!(page.next_token.as_ref().map(ContinuationToken::as_str), Some("f/2"));

    let requests = server.await.unwrap();
    assert_eq!(
        requests[0].header("x-amz-target"),
        Some("Logs_20140328.GetLogEvents")
    );
    assert_eq!(
        requests[0].body,
        r#"{"logGroupName":"/aws/lambda/svc-a","logStreamName":"2024/01/01/s1","nextToken":"f/1","startFromHead":true}"#
    );
}

#[tokio::test]
async fn other_errors_are_not_retried_and_keep_message() {
    let (endpoint, server) = serve(vec![(
        400,
        r#"{"__type":"AccessDeniedException","message":"User is not authorized"}"#,
    )])
    .await;

    let stream = StreamName::new("2024/01/01/s1").unwrap();
    let err = client(&endpoint)
        .get_events(&source(), &stream, None)
        .await
        .unwrap_err();

    assert!(!err.is_not_found());
    assert!(err.to_string().contains("User is not authorized"));
    assert_eq!(server.await.unwrap().len(), 1);
}

#[tokio::test]
async fn endpoint_path_is_requested_and_signed() {
    let (endpoint, server) = serve(vec![(200, r#"{"logStreams":[]}"#)]).await;

    let streams = client(&format!("{endpoint}/proxy/logs"))
        .list_latest_streams(&source(), 1)
        .await
        .unwrap();
    assert!(streams.is_empty());

    let requests = server.await.unwrap();
    assert!(requests[0].head.starts_with("POST /proxy/logs HTTP/1.1"));
    assert!(signature_matches(&requests[0], "secret"));
}
