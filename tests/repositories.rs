//! Both repositories sharing one bucket, driven through the public API.

use bytes::Bytes;
use drawing_store::{DrawingRepository, MemoryObjectStore, ObjectStore, SessionRepository};
use std::sync::Arc;

const BUCKET: &str = "test-xcalidrawings";

fn repositories(store: &MemoryObjectStore) -> (DrawingRepository, SessionRepository) {
    let shared: Arc<dyn ObjectStore> = Arc::new(store.clone());
    (
        DrawingRepository::new(shared.clone(), Some(BUCKET)),
        SessionRepository::new(shared, Some(BUCKET)),
    )
}

#[tokio::test]
async fn drawings_are_listed_and_read_back() {
    let store = MemoryObjectStore::new();
    let (drawings, _) = repositories(&store);

    let titles = ["some title", "some other title"];
    let contents = ["some content", "some other content"];
    for (title, content) in titles.iter().zip(contents) {
        drawings
            .put(title, Bytes::from(content), "test-user")
            .await
            .unwrap();
    }

    let mut listed = drawings.list_titles().await.unwrap();
    listed.sort();
    let mut expected = titles.map(String::from).to_vec();
    expected.sort();
    assert_eq!(listed, expected);

    assert_eq!(
        drawings.get("some other title").await.unwrap(),
        Bytes::from_static(b"some other content")
    );
}

#[tokio::test]
async fn second_session_replaces_the_first() {
    let store = MemoryObjectStore::new();
    let (_, sessions) = repositories(&store);

    let first = sessions.create_session().await.unwrap();
    let second = sessions.create_session().await.unwrap();

    assert_ne!(first, second);
    assert_eq!(
        sessions.list_sessions().await.unwrap(),
        vec![second.to_string()]
    );
}

#[tokio::test]
async fn namespaces_stay_independent_in_one_bucket() {
    let store = MemoryObjectStore::with_page_size(1);
    let (drawings, sessions) = repositories(&store);
    store
        .put_object(BUCKET, "credentials", Bytes::from_static(b"qwer\n"))
        .await
        .unwrap();
    store
        .put_object(BUCKET, "client/index.html", Bytes::from_static(b"<html/>"))
        .await
        .unwrap();

    drawings
        .put("plan", Bytes::from_static(b"p"), "u")
        .await
        .unwrap();
    let id = sessions.create_session().await.unwrap();

    assert_eq!(drawings.list_titles().await.unwrap(), vec!["plan"]);
    assert_eq!(sessions.list_sessions().await.unwrap(), vec![id.to_string()]);

    sessions.create_session().await.unwrap();
    assert_eq!(drawings.get("plan").await.unwrap(), Bytes::from_static(b"p"));
    assert_eq!(sessions.get_allowed_credentials().await.unwrap(), "qwer\n");
    assert!(
        sessions
            .serve_client_code("/missing.css")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn every_read_path_reports_not_found_the_same_way() {
    let store = MemoryObjectStore::new();
    let (drawings, sessions) = repositories(&store);

    assert!(drawings.get("nothing").await.unwrap_err().is_not_found());
    assert!(sessions.get_allowed_credentials().await.unwrap_err().is_not_found());
    assert!(sessions.serve_client_code("/nothing").await.unwrap_err().is_not_found());
}
