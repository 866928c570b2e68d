mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use m3u_aggregator::config::Config;
use m3u_aggregator::player::{
    AlternativesProvider, CatalogAlternatives, FallbackController, HttpAlternativesClient,
    PlaybackOutcome, PlayerSettings, SessionState, Transition,
};
use m3u_aggregator::web::{AppState, WebServer};

fn settings() -> PlayerSettings {
    PlayerSettings {
        auto_switch: true,
        load_timeout: Duration::from_secs(10),
        alternative_delay: Duration::from_millis(1500),
        channel_delay: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_fallback_over_aggregated_catalog() {
    let service = common::catalog_service();
    service.rebuild().await.unwrap();
    let catalog = service.current();
    let provider = Arc::new(CatalogAlternatives::new(service.store().clone()));
    let mut controller =
        FallbackController::new(provider, catalog.channels().to_vec(), settings());

    let primary = controller.play(0).await.unwrap();
    assert_eq!(primary.url, "http://alpha.example.com/bbc-news");

    let alternative = match controller
        .on_playback_outcome(primary.token, PlaybackOutcome::Failed)
        .await
    {
        Transition::Play(command) => command,
        other => panic!("expected the beta alternative, got {other:?}"),
    };
    assert_eq!(alternative.url, "http://beta.example.com/bbc");
    assert_eq!(alternative.delay, Duration::from_millis(1500));

    let next = match controller
        .on_playback_outcome(alternative.token, PlaybackOutcome::LoadTimeout)
        .await
    {
        Transition::Play(command) => command,
        other => panic!("expected a channel switch, got {other:?}"),
    };
    assert_eq!(next.channel_id, 1);
    assert_eq!(next.label, "Euronews");
    assert_eq!(next.delay, Duration::from_secs(2));

    controller.close();
    assert_eq!(
        controller
            .on_playback_outcome(next.token, PlaybackOutcome::LoadTimeout)
            .await,
        Transition::Ignored
    );
    assert_eq!(controller.state(), &SessionState::Idle);
}

#[tokio::test]
async fn test_http_alternatives_client_against_server() {
    let service = common::catalog_service();
    service.rebuild().await.unwrap();
    let app = WebServer::create_router(AppState::new(
        Arc::new(Config::default()),
        service,
        None,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client =
        HttpAlternativesClient::new(&format!("http://{addr}/"), Duration::from_secs(5)).unwrap();

    let alternatives = client.alternatives(0).await.unwrap();
    assert_eq!(alternatives.len(), 1);
    assert_eq!(alternatives[0].source_name, "beta");
    assert!(client.alternatives(1).await.unwrap().is_empty());
    assert!(matches!(
        client.alternatives(42).await,
        Err(m3u_aggregator::AppError::NotFound { .. })
    ));
}
