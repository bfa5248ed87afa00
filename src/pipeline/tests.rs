use super::*;
use crate::config::ResolverConfig;
use crate::stream::EventEmitter;
use crate::types::{LogEntry, ResolutionEvent};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    fetcher: Fetcher,
    table: DomainTable,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let config = ResolverConfig {
        timer_endpoint: format!("{}/timer", server.uri()),
        direct_endpoint: format!("{}/direct", server.uri()),
        ..Default::default()
    };
    Harness {
        fetcher: Fetcher::new(config).unwrap(),
        table: DomainTable::default(),
        server,
    }
}

async fn run(
    h: &Harness,
    link: &str,
) -> (Result<Resolved, PipelineError>, Vec<ResolutionEvent>, Vec<LogEntry>) {
    let (emitter, mut rx) = EventEmitter::channel();
    let mut reporter = LinkReporter::new(11, emitter);
    let outcome = resolve_link(&h.fetcher, &h.table, link, &mut reporter).await;
    let events = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    (outcome, events, reporter.into_logs())
}

fn messages(logs: &[LogEntry]) -> Vec<&str> {
    logs.iter().map(|l| l.message.as_str()).collect()
}

async fn mount_timer(server: &MockServer, from: &str, to: &str) {
    Mock::given(method("GET"))
        .and(path("/timer"))
        .and(query_param("url", from))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "extracted_link": to
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_direct(server: &MockServer, link: &str) {
    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("url", link))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "best_button_name": "Download [FSL Server]",
            "best_download_link": "https://fsl.example/movie.mkv",
            "all_available_buttons": [
                {"button_name": "Download [FSL Server]", "download_link": "https://fsl.example/movie.mkv"}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn final_host_skips_straight_to_direct_resolver() {
    let h = harness().await;
    mount_direct(&h.server, "https://hubcloud.foo/drive/abc").await;
    Mock::given(path("/timer"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let (outcome, events, _) = run(&h, "https://hubcloud.foo/drive/abc").await;
    let resolved = outcome.unwrap();

    assert_eq!(resolved.direct.link, "https://fsl.example/movie.mkv");
    assert_eq!(resolved.message, "Completed via Download [FSL Server]");
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.id == 11 && !e.is_terminal()));
    assert_eq!(
        events[1].message.as_deref(),
        Some("Getting direct link (HubCloud)...")
    );
}

#[tokio::test]
async fn timer_chain_is_cut_off_after_three_hops() {
    let h = harness().await;
    mount_timer(&h.server, "https://gadgetsweb.xyz/1", "https://gadgetsweb.xyz/2").await;
    mount_timer(&h.server, "https://gadgetsweb.xyz/2", "https://gadgetsweb.xyz/3").await;
    mount_timer(&h.server, "https://gadgetsweb.xyz/3", "https://gadgetsweb.xyz/4").await;
    Mock::given(path("/timer"))
        .and(query_param("url", "https://gadgetsweb.xyz/4"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let (outcome, _, logs) = run(&h, "https://gadgetsweb.xyz/1").await;

    assert_eq!(outcome.unwrap_err(), PipelineError::UnrecognizedLink);
    let calls = messages(&logs)
        .into_iter()
        .filter(|m| *m == "Calling timer decoder...")
        .count();
    assert_eq!(calls, 3);
}

#[tokio::test]
async fn full_chain_through_every_stage() {
    let h = harness().await;
    let hblinks_page = format!("{}/hblinks/archives/1", h.server.uri());
    let hubdrive_page = format!("{}/hubdrive/file/2", h.server.uri());

    mount_timer(&h.server, "https://cryptoinsights.site/?go=1", &hblinks_page).await;
    Mock::given(method("GET"))
        .and(path("/hblinks/archives/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<a href="https://t.me/chan">Join</a><a href="{}">HubDrive</a>"#,
            hubdrive_page
        )))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hubdrive/file/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a class="btn btn-success" href="https://hubcloud.foo/drive/zz">HubCloud</a>"#,
        ))
        .mount(&h.server)
        .await;
    mount_direct(&h.server, "https://hubcloud.foo/drive/zz").await;

    let (outcome, _, logs) = run(&h, "https://cryptoinsights.site/?go=1").await;
    let resolved = outcome.unwrap();

    assert_eq!(resolved.direct.label.as_deref(), Some("Download [FSL Server]"));
    assert_eq!(resolved.direct.buttons.len(), 1);
    assert_eq!(
        messages(&logs),
        vec![
            "Timer page detected",
            "Calling timer decoder...",
            "Timer bypassed",
            &*format!("Link after timer: {}", hblinks_page),
            "Solving HBLinks...",
            "HBLinks solved via HubCloud/HubDrive (Generic)",
            "Solving HubDrive...",
            "HubDrive solved via HubDrive (Success Button)",
            "Link after HubDrive: https://hubcloud.foo/drive/zz",
            "Getting direct link (HubCloud)...",
        ]
    );
}

#[tokio::test]
async fn unknown_page_after_first_hop_goes_through_decoder() {
    let h = harness().await;
    mount_timer(&h.server, "https://ngwin.com/a", "https://short.example/b").await;
    mount_timer(&h.server, "https://short.example/b", "https://hubcloud.foo/drive/c").await;
    mount_direct(&h.server, "https://hubcloud.foo/drive/c").await;

    let (outcome, _, logs) = run(&h, "https://ngwin.com/a").await;

    assert!(outcome.is_ok());
    assert!(messages(&logs).contains(&"Bypassing intermediate page: https://short.example/b"));
}

#[tokio::test]
async fn intermediate_failure_ends_the_link() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/hblinks/archives/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.server)
        .await;
    Mock::given(path("/direct"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let link = format!("{}/hblinks/archives/9", h.server.uri());
    let (outcome, _, logs) = run(&h, &link).await;

    match outcome.unwrap_err() {
        PipelineError::Stage { stage, source } => {
            assert_eq!(stage, "HBLinks");
            assert_eq!(source, StageError::Fetch("cannot open page, status 404".into()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        logs.last().unwrap().message,
        "HBLinks error: cannot open page, status 404"
    );
}

#[tokio::test]
async fn timer_failure_is_reported_as_the_cause() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/timer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "token expired"
        })))
        .mount(&h.server)
        .await;

    let (outcome, _, _) = run(&h, "https://review-tech.in/x").await;
    let err = outcome.unwrap_err();
    assert_eq!(err.to_string(), "Timer bypass failed: token expired");
}

#[tokio::test]
async fn unrecognized_link_makes_no_calls() {
    let h = harness().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let (outcome, events, _) = run(&h, "https://example.com/movie").await;
    assert_eq!(outcome.unwrap_err(), PipelineError::UnrecognizedLink);
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn blank_link_is_rejected_without_network() {
    let h = harness().await;
    let (outcome, events, _) = run(&h, "   ").await;
    assert_eq!(outcome.unwrap_err(), PipelineError::MissingLink);
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn hubcdn_link_resolves_in_one_hop() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/hubcdn.fans/dl/5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a id="vd" href="https://cdn.example/5.mkv">Download</a>"#),
        )
        .mount(&h.server)
        .await;

    let link = format!("{}/hubcdn.fans/dl/5", h.server.uri());
    let (outcome, events, _) = run(&h, &link).await;

    assert_eq!(outcome.unwrap().direct, DirectLink::plain("https://cdn.example/5.mkv"));
    assert_eq!(events.len(), 2);
}
