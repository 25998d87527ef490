//! End-to-end request handling over an in-memory connection.

mod common;

use common::{
    form_request, get_request, payload, split_response, upload_request, TestSite, PUBLIC_URL,
};
use tls_fileserver::http::pages;
use tls_fileserver::http::ConnectionError;

#[tokio::test]
async fn put_is_forbidden_and_runs_no_handler() {
    let site = TestSite::new();
    let mut request = b"PUT /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n".to_vec();
    request.extend_from_slice(b"data");

    let (response, result) = site.exchange(request).await;
    result.unwrap();

    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.1 403 Forbidden\r\n"));
    assert_eq!(body, pages::FORBIDDEN.as_bytes());
    assert_eq!(std::fs::read_dir(site.ctx.storage().user_root()).unwrap().count(), 0);
}

#[tokio::test]
async fn malformed_request_line_gets_no_bytes() {
    let site = TestSite::new();
    let (response, result) = site.exchange(b"GET /\r\n\r\n".to_vec()).await;
    assert!(response.is_empty());
    assert!(matches!(result, Err(ConnectionError::Parse(_))));
}

#[tokio::test]
async fn silent_client_is_a_quiet_close() {
    let site = TestSite::new();
    let (response, result) = site.exchange(Vec::new()).await;
    assert!(response.is_empty());
    assert!(result.unwrap_err().is_silent_close());
}

#[tokio::test]
async fn index_and_unknown_path() {
    let site = TestSite::new();

    let (response, _) = site.exchange(get_request("/")).await;
    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains(&format!("Content-Length: {}", body.len())));
    assert!(String::from_utf8(body).unwrap().contains("Welcome Guest"));

    let (response, _) = site.exchange(get_request("/does-not-exist")).await;
    assert!(response.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn signin_and_logout_are_stubs() {
    let site = TestSite::new();
    for path in ["/signin", "/logout"] {
        let (response, _) = site.exchange(get_request(path)).await;
        let (head, body) = split_response(&response);
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"), "{path}");
        assert!(String::from_utf8(body).unwrap().contains("not available"));
    }
}

#[tokio::test]
async fn png_upload_accepted_in_any_case() {
    let site = TestSite::new();
    let content = payload(3000);

    let (response, result) = site
        .exchange(upload_request("photo.PNG", "image/png", None, &content))
        .await;
    result.unwrap();

    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    let body = String::from_utf8(body).unwrap();
    assert!(body.contains("Upload completed!"));
    assert!(body.contains(&format!("url={PUBLIC_URL}/list")));
    assert_eq!(std::fs::read(site.user_file("photo.PNG")).unwrap(), content);
}

#[tokio::test]
async fn jpeg_declared_png_file_is_conflict_and_untouched() {
    let site = TestSite::new();

    let (response, result) = site
        .exchange(upload_request("photo.png", "image/jpeg", None, &payload(500)))
        .await;
    result.unwrap();
    assert!(response.starts_with(b"HTTP/1.1 409 Conflict\r\n"));
    assert!(!site.user_file("photo.png").exists());

    std::fs::write(site.user_file("photo.png"), b"original").unwrap();
    let (response, _) = site
        .exchange(upload_request("photo.png", "image/jpeg", None, &payload(500)))
        .await;
    assert!(response.starts_with(b"HTTP/1.1 409 Conflict\r\n"));
    assert_eq!(std::fs::read(site.user_file("photo.png")).unwrap(), b"original");
}

#[tokio::test]
async fn resume_appends_only_at_stored_size() {
    let site = TestSite::with_chunk_size(256);
    let full = payload(2000);
    std::fs::write(site.user_file("data.txt"), &full[..1000]).unwrap();

    let (response, _) = site
        .exchange(upload_request(
            "data.txt",
            "text/plain",
            Some("bytes 900-1999/2000"),
            &full[900..],
        ))
        .await;
    assert!(response.starts_with(b"HTTP/1.1 409 Conflict\r\n"));
    let (_, body) = split_response(&response);
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("Mismatched start byte: resume at 900, stored 1000 bytes"), "{body}");
    assert_eq!(std::fs::metadata(site.user_file("data.txt")).unwrap().len(), 1000);

    let (response, _) = site
        .exchange(upload_request(
            "data.txt",
            "text/plain",
            Some("bytes 1000-1999/2000"),
            &full[1000..],
        ))
        .await;
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert_eq!(std::fs::read(site.user_file("data.txt")).unwrap(), full);
}

#[tokio::test]
async fn upload_then_download_is_identical_for_any_chunk_size() {
    let content = payload(50_000);
    for chunk_size in [7, 1024, 8192, 65_536] {
        let site = TestSite::with_chunk_size(chunk_size);

        let (response, _) = site
            .exchange(upload_request("blob.zip", "application/zip", None, &content))
            .await;
        assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"), "chunk {chunk_size}");

        let (response, result) = site
            .exchange(form_request("/download", "FilePath=blob.zip&btnSubmit=Download"))
            .await;
        result.unwrap();
        let (head, body) = split_response(&response);
        assert!(head.contains("Content-Type: application/octet-stream"));
        assert!(head.contains("Content-Length: 50000"));
        assert!(head.contains("Content-Disposition: attachment; filename=\"blob.zip\""));
        assert_eq!(body, content, "chunk {chunk_size}");
    }
}

#[tokio::test]
async fn empty_file_download_sends_nothing() {
    let site = TestSite::new();
    std::fs::write(site.user_file("empty.txt"), b"").unwrap();

    let (response, result) = site.exchange(form_request("/download", "FilePath=empty.txt")).await;
    result.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn download_not_found_cases() {
    let site = TestSite::new();
    std::fs::write(site.work_dir().join("secret.txt"), b"outside").unwrap();

    for form in ["FilePath=missing.txt", "btnSubmit=Download", "FilePath=..%2F..%2Fsecret.txt"] {
        let (response, _) = site.exchange(form_request("/download", form)).await;
        let (head, body) = split_response(&response);
        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"), "{form}");
        assert!(String::from_utf8(body).unwrap().contains("Download file not found!"));
    }
}

#[tokio::test]
async fn download_decodes_slashes_into_subdirectories() {
    let site = TestSite::new();
    std::fs::create_dir_all(site.user_file("docs")).unwrap();
    std::fs::write(site.user_file("docs/readme.txt"), b"hello").unwrap();

    let (response, _) = site
        .exchange(form_request("/download", "FilePath=docs%2Freadme.txt"))
        .await;
    let (head, body) = split_response(&response);
    assert!(head.contains("filename=\"readme.txt\""));
    assert_eq!(body, b"hello");
}

#[tokio::test]
async fn listing_shows_uploaded_files() {
    let site = TestSite::new();
    std::fs::write(site.user_file("notes.txt"), vec![b'n'; 2048]).unwrap();
    std::fs::create_dir_all(site.user_file("archive")).unwrap();

    let (response, _) = site.exchange(get_request("/list")).await;
    let (_, body) = split_response(&response);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<td>FILE</td><td>notes.txt</td><td>2.00 KB</td>"));
    let dir_row = html.find("<td>archive</td>").unwrap();
    let file_row = html.find("<td>notes.txt</td>").unwrap();
    assert!(dir_row < file_row, "directories are listed first");
}

#[tokio::test]
async fn register_form_handling() {
    let site = TestSite::new();

    let (response, _) = site.exchange(form_request("/register", "")).await;
    let (head, body) = split_response(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(String::from_utf8(body).unwrap().contains("Signup could not complete"));

    let (response, _) = site
        .exchange(form_request("/register", "txtUsername=ann&txtPassword=pw&btnSubmit=Register"))
        .await;
    let (_, body) = split_response(&response);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Signup successful!"));
    assert!(html.contains(&format!("content='5;url={PUBLIC_URL}'")));
}

#[tokio::test]
async fn favicon_is_served_as_icon() {
    let site = TestSite::new();

    let (response, _) = site.exchange(get_request("/favicon.ico")).await;
    assert!(response.starts_with(b"HTTP/1.1 404 Not Found\r\n"));

    let icon = site.ctx.storage().favicon_path().to_path_buf();
    std::fs::create_dir_all(icon.parent().unwrap()).unwrap();
    std::fs::write(&icon, [0u8, 0, 1, 0, 0xff]).unwrap();

    let (response, _) = site.exchange(get_request("/favicon.ico")).await;
    let (head, body) = split_response(&response);
    assert!(head.contains("Content-Type: image/x-icon"));
    assert!(head.contains("Content-Length: 5"));
    assert_eq!(body, [0u8, 0, 1, 0, 0xff]);
}

#[tokio::test]
async fn truncated_upload_keeps_partial_file_for_resume() {
    let site = TestSite::with_chunk_size(512);
    let content = payload(10_000);
    let request = upload_request("big.txt", "text/plain", None, &content);

    // Client disconnects after sending half the request.
    let (response, result) = site.exchange(request[..request.len() / 2].to_vec()).await;
    assert!(response.is_empty());
    assert!(matches!(result, Err(ConnectionError::Upload(_))));

    let stored = std::fs::read(site.user_file("big.txt")).unwrap();
    assert!(!stored.is_empty());
    assert_eq!(stored, content[..stored.len()]);

    let range = format!("bytes {}-9999/10000", stored.len());
    let (response, _) = site
        .exchange(upload_request(
            "big.txt",
            "text/plain",
            Some(&range),
            &content[stored.len()..],
        ))
        .await;
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert_eq!(std::fs::read(site.user_file("big.txt")).unwrap(), content);
}

#[test]
fn unknown_methods_do_not_grow_request_series() {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let site = TestSite::new();
            for i in 0..50 {
                let request = format!("X{i}RANDOM / HTTP/1.1\r\n\r\n").into_bytes();
                let (response, result) = site.exchange(request).await;
                result.unwrap();
                assert!(response.starts_with(b"HTTP/1.1 403 Forbidden\r\n"));
            }
        });
    });

    let rendered = handle.render();
    let series: Vec<&str> = rendered
        .lines()
        .filter(|line| line.starts_with("fileserver_requests_total{"))
        .collect();
    assert_eq!(series.len(), 1, "{rendered}");
    assert!(series[0].contains("method=\"OTHER\""));
    assert!(series[0].ends_with(" 50"));
}
