use tempfile::tempdir;
use ttv_rs::{
    quality::Quality,
    resolver::{Resolution, Resolver},
    tailer::{TailEnd, Tailer},
    twitch::TwitchApi,
    util::HttpClient,
    writer::ChunkWriter,
};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const CHANNEL: &str = "somechannel";

fn http_client() -> HttpClient {
    HttpClient::new("test-client-id").expect("Could not create HttpClient")
}

fn api_for(server: &MockServer) -> TwitchApi {
    let uri = server.uri();
    TwitchApi::with_endpoints(
        http_client(),
        &format!("{}/helix", uri),
        &format!("{}/api", uri),
        &format!("{}/api/channel/hls", uri),
    )
}

fn master_playlist(uri: &str, variants: &[(&str, &str)]) -> String {
    let mut lines = vec![
        "#EXTM3U".to_string(),
        "#EXT-X-TWITCH-INFO:NODE=\"video-edge\",SERVER-TIME=\"1722700000.00\"".to_string(),
    ];
    for (label, group) in variants {
        lines.push(format!(
            "#EXT-X-MEDIA:TYPE=VIDEO,GROUP-ID=\"{}\",NAME=\"{}\",AUTOSELECT=YES,DEFAULT=YES",
            group, label
        ));
        lines.push(
            "#EXT-X-STREAM-INF:BANDWIDTH=3000000,CODECS=\"avc1.4D401F,mp4a.40.2\"".to_string(),
        );
        lines.push(format!("{}/playlist/{}.m3u8", uri, group));
    }

    lines.join("\n")
}

fn media_playlist(uri: &str, start: i64, count: i64) -> String {
    let mut lines = vec![
        "#EXTM3U".to_string(),
        "#EXT-X-VERSION:3".to_string(),
        "#EXT-X-TARGETDURATION:6".to_string(),
        format!("#EXT-X-MEDIA-SEQUENCE:{}", start),
        "#EXT-X-TWITCH-ELAPSED-SECS:600.000".to_string(),
        "#EXT-X-TWITCH-TOTAL-SECS:630.000".to_string(),
        "#EXT-X-DATERANGE:ID=\"playlist-creation\",CLASS=\"timestamp\"".to_string(),
        "#EXT-X-DATERANGE:ID=\"playlist-session\",CLASS=\"twitch-session\"".to_string(),
    ];
    for seq in start..start + count {
        lines.push("#EXT-X-PROGRAM-DATE-TIME:2024-08-03T16:36:40.000Z".to_string());
        lines.push("#EXTINF:6.000,live".to_string());
        lines.push(format!("{}/seg/{}.ts", uri, seq));
    }

    lines.join("\n")
}

async fn mount_token(server: &MockServer, expect: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/channels/{}/access_token", CHANNEL)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"token":"tok","sig":"sig"}"#),
        )
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_master(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/api/channel/hls/{}.m3u8", CHANNEL)))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_segment(server: &MockServer, seq: i64, expect: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/seg/{}.ts", seq)))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(format!("payload-{}", seq).into_bytes()),
        )
        .expect(expect)
        .mount(server)
        .await;
}

#[tokio::test]
async fn probe_reports_live_channel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .and(query_param("user_login", CHANNEL))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"data":[{"title":"speedrun","type":"live"}]}"#),
        )
        .mount(&server)
        .await;

    let api = api_for(&server);
    assert!(api.is_live(CHANNEL).await.expect("probe failed"));
}

#[tokio::test]
async fn offline_probe_makes_no_token_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/helix/streams"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
        .mount(&server)
        .await;
    mount_token(&server, 0).await;

    let api = api_for(&server);
    assert!(!api.is_live(CHANNEL).await.expect("probe failed"));
}

#[tokio::test]
async fn resolver_selects_first_variant_within_constraint() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    let master = master_playlist(
        &server.uri(),
        &[
            ("1080p60 (source)", "chunked"),
            ("720p60", "720p60"),
            ("480p30", "480p30"),
            ("audio_only", "audio_only"),
        ],
    );
    Mock::given(method("GET"))
        .and(path(format!("/api/channel/hls/{}.m3u8", CHANNEL)))
        .and(query_param("token", "tok"))
        .and(query_param("sig", "sig"))
        .and(query_param("allow_source", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(master))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let mut resolver = Resolver::new();
    let constraint: Quality = "720p30".parse().unwrap();

    match resolver
        .resolve(&api, CHANNEL, &constraint)
        .await
        .expect("resolve failed")
    {
        Resolution::Active(url) => assert!(url.ends_with("/playlist/480p30.m3u8")),
        other => panic!("unexpected resolution: {:?}", other),
    }
    assert_eq!(resolver.chosen_line(), Some(10));
}

#[tokio::test]
async fn resolver_reacquires_rejected_token() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/channel/hls/{}.m3u8", CHANNEL)))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let master = master_playlist(&server.uri(), &[("480p30", "480p30")]);
    mount_master(&server, ResponseTemplate::new(200).set_body_string(master)).await;

    let api = api_for(&server);
    let mut resolver = Resolver::new();
    let constraint: Quality = "infp60".parse().unwrap();

    match resolver
        .resolve(&api, CHANNEL, &constraint)
        .await
        .expect("resolve failed")
    {
        Resolution::Active(url) => assert!(url.ends_with("/playlist/480p30.m3u8")),
        other => panic!("unexpected resolution: {:?}", other),
    }
}

#[tokio::test]
async fn resolver_reports_offline_on_missing_playlist() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_master(&server, ResponseTemplate::new(404)).await;

    let api = api_for(&server);
    let mut resolver = Resolver::new();
    let constraint: Quality = "infp".parse().unwrap();

    assert!(matches!(
        resolver
            .resolve(&api, CHANNEL, &constraint)
            .await
            .expect("resolve failed"),
        Resolution::Offline
    ));
}

#[tokio::test]
async fn resolver_reports_no_match() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    let master = master_playlist(
        &server.uri(),
        &[("1080p60 (source)", "chunked"), ("720p60", "720p60")],
    );
    mount_master(&server, ResponseTemplate::new(200).set_body_string(master)).await;

    let api = api_for(&server);
    let mut resolver = Resolver::new();
    let constraint: Quality = "480p30".parse().unwrap();

    assert!(matches!(
        resolver
            .resolve(&api, CHANNEL, &constraint)
            .await
            .expect("resolve failed"),
        Resolution::NoMatch
    ));
    assert_eq!(resolver.chosen_line(), None);
}

#[tokio::test]
async fn resolver_reuses_pinned_variant_line() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;

    let first = master_playlist(
        &server.uri(),
        &[("720p60", "720p60"), ("480p30", "480p30")],
    );
    // Fresh playlist as served after a token refresh: same layout, new
    // URLs, and a first entry a rescan would now select.
    let second = master_playlist(
        &server.uri(),
        &[("360p30", "updated-360p30"), ("480p30", "updated-480p30")],
    );

    Mock::given(method("GET"))
        .and(path(format!("/api/channel/hls/{}.m3u8", CHANNEL)))
        .respond_with(ResponseTemplate::new(200).set_body_string(first))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_master(&server, ResponseTemplate::new(200).set_body_string(second)).await;

    let api = api_for(&server);
    let mut resolver = Resolver::new();
    let constraint: Quality = "480p30".parse().unwrap();

    match resolver
        .resolve(&api, CHANNEL, &constraint)
        .await
        .expect("resolve failed")
    {
        Resolution::Active(url) => assert!(url.ends_with("/playlist/480p30.m3u8")),
        other => panic!("unexpected resolution: {:?}", other),
    }
    assert_eq!(resolver.chosen_line(), Some(7));

    // Token expired while tailing: the re-resolve must reuse line 7,
    // not rescan (which would land on the 360p30 entry).
    match resolver
        .resolve(&api, CHANNEL, &constraint)
        .await
        .expect("re-resolve failed")
    {
        Resolution::Active(url) => assert!(url.ends_with("/playlist/updated-480p30.m3u8")),
        other => panic!("unexpected resolution: {:?}", other),
    }
    assert_eq!(resolver.chosen_line(), Some(7));
}

#[tokio::test]
async fn tail_poll_groups_window_into_one_chunk() {
    let server = MockServer::start().await;
    for seq in 100..105 {
        mount_segment(&server, seq, 1).await;
    }
    Mock::given(method("GET"))
        .and(path("/media.m3u8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(media_playlist(&server.uri(), 100, 5)),
        )
        .mount(&server)
        .await;

    let client = http_client();
    let dir = tempdir().expect("Could not create tempdir");
    let mut writer = ChunkWriter::new(dir.path());
    let mut tailer = Tailer::new();
    let url = format!("{}/media.m3u8", server.uri());

    let end = tailer
        .poll_once(&client, &url, &mut writer)
        .await
        .expect("poll failed");
    assert!(end.is_none());
    writer.finish().await.expect("finish failed");

    assert_eq!(tailer.cursor(), 104);
    let chunk = std::fs::read_to_string(dir.path().join("20.ts")).expect("no chunk 20");
    assert_eq!(
        chunk,
        "payload-100payload-101payload-102payload-103payload-104"
    );
    assert!(!dir.path().join("21.ts").exists());
}

#[tokio::test]
async fn tail_poll_resumes_from_cursor() {
    let server = MockServer::start().await;
    // Every segment is fetched exactly once across both polls.
    for seq in 100..108 {
        mount_segment(&server, seq, 1).await;
    }
    Mock::given(method("GET"))
        .and(path("/media.m3u8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(media_playlist(&server.uri(), 100, 5)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media.m3u8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(media_playlist(&server.uri(), 100, 8)),
        )
        .mount(&server)
        .await;

    let client = http_client();
    let dir = tempdir().expect("Could not create tempdir");
    let mut writer = ChunkWriter::new(dir.path());
    let mut tailer = Tailer::new();
    let url = format!("{}/media.m3u8", server.uri());

    tailer
        .poll_once(&client, &url, &mut writer)
        .await
        .expect("first poll failed");
    assert_eq!(tailer.cursor(), 104);

    tailer
        .poll_once(&client, &url, &mut writer)
        .await
        .expect("second poll failed");
    assert_eq!(tailer.cursor(), 107);
    writer.finish().await.expect("finish failed");

    let chunk20 = std::fs::read_to_string(dir.path().join("20.ts")).expect("no chunk 20");
    assert_eq!(
        chunk20,
        "payload-100payload-101payload-102payload-103payload-104"
    );
    let chunk21 = std::fs::read_to_string(dir.path().join("21.ts")).expect("no chunk 21");
    assert_eq!(chunk21, "payload-105payload-106payload-107");
}

#[tokio::test]
async fn tail_poll_detects_token_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media.m3u8"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = http_client();
    let dir = tempdir().expect("Could not create tempdir");
    let mut writer = ChunkWriter::new(dir.path());
    let mut tailer = Tailer::new();
    let url = format!("{}/media.m3u8", server.uri());

    let end = tailer
        .poll_once(&client, &url, &mut writer)
        .await
        .expect("poll failed");
    assert_eq!(end, Some(TailEnd::TokenExpired));
    assert_eq!(tailer.cursor(), -1);
}

#[tokio::test]
async fn tail_poll_detects_broadcast_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media.m3u8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = http_client();
    let dir = tempdir().expect("Could not create tempdir");
    let mut writer = ChunkWriter::new(dir.path());
    let mut tailer = Tailer::new();
    let url = format!("{}/media.m3u8", server.uri());

    let end = tailer
        .poll_once(&client, &url, &mut writer)
        .await
        .expect("poll failed");
    assert_eq!(end, Some(TailEnd::Ended));

    // Nothing was written.
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}
