//! End-to-end image staging and resolution.

use std::sync::Arc;

use blockpress_kernel::{
    ImageFile, ImageStager, LocalImageStore, MemoryImageStore, StagingConfig, contains_ephemeral,
};
use blockpress_types::block::{ImageData, TextData};
use blockpress_types::{Block, BlockData, Document};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

fn text_of(doc: &Document, index: usize) -> String {
    match doc.blocks()[index].data() {
        BlockData::Text(t) => t.content.clone(),
        other => panic!("expected text block, got {other:?}"),
    }
}

#[tokio::test]
async fn test_two_images_in_one_text_block_resolve_to_distinct_urls() {
    let store = Arc::new(MemoryImageStore::new());
    let mut stager = ImageStager::new(store.clone(), StagingConfig::default());

    let first = stager.stage(ImageFile::new(JPEG, "image/jpeg")).unwrap();
    let second = stager.stage(ImageFile::new(PNG, "image/png")).unwrap();
    assert_ne!(first, second);

    let doc = Document::from_blocks(vec![Block::new(TextData {
        content: format!("Before ![one]({first}) middle ![two]({second}) after"),
    })])
    .unwrap();

    let resolved = stager.resolve_all(&doc).await.unwrap();
    assert!(!contains_ephemeral(&resolved));
    assert_eq!(store.upload_count(), 2);

    let url_1 = stager.resolved_url(&first).unwrap().to_string();
    let url_2 = stager.resolved_url(&second).unwrap().to_string();
    assert_ne!(url_1, url_2);
    assert_eq!(
        text_of(&resolved, 0),
        format!("Before ![one]({url_1}) middle ![two]({url_2}) after")
    );
    assert_eq!(store.get(&url_1).unwrap(), JPEG);
    assert_eq!(store.get(&url_2).unwrap(), PNG);
}

#[tokio::test]
async fn test_upload_count_equals_distinct_placeholders() {
    let store = Arc::new(MemoryImageStore::new());
    let mut stager = ImageStager::new(store.clone(), StagingConfig::default());

    let a = stager.stage(ImageFile::from_bytes(JPEG)).unwrap();
    let b = stager.stage(ImageFile::from_bytes(PNG)).unwrap();
    // Staged but never referenced: not uploaded
    stager.stage(ImageFile::from_bytes(b"GIF89a-unused".to_vec())).unwrap();

    let doc = Document::from_blocks(vec![
        Block::new(ImageData {
            src: a.clone(),
            ..Default::default()
        }),
        Block::new(TextData {
            content: format!("![a]({a}) ![b]({b}) ![a again]({a})"),
        }),
        Block::new(ImageData {
            src: b.clone(),
            caption: Some("same as above".into()),
            ..Default::default()
        }),
    ])
    .unwrap();

    let once = stager.resolve_all(&doc).await.unwrap();
    let twice = stager.resolve_all(&doc).await.unwrap();
    assert!(once.content_eq(&twice));
    assert_eq!(store.upload_count(), 2);
    assert_eq!(stager.len(), 1);
}

#[tokio::test]
async fn test_resolving_a_clean_document_uploads_nothing() {
    let store = Arc::new(MemoryImageStore::new());
    let mut stager = ImageStager::new(store.clone(), StagingConfig::default());
    stager.stage(ImageFile::from_bytes(PNG)).unwrap();

    let doc = Document::from_blocks(vec![Block::new(TextData {
        content: "![remote](https://cdn.example/x.png)".into(),
    })])
    .unwrap();
    let out = stager.resolve_all(&doc).await.unwrap();
    assert!(out.content_eq(&doc));
    assert_eq!(store.upload_count(), 0);
}

#[tokio::test]
async fn test_local_store_writes_content_addressed_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalImageStore::new(dir.path(), "https://cdn.example/uploads"));
    let mut stager = ImageStager::new(store, StagingConfig::default().with_folder("posts"));

    let repr = stager.stage(ImageFile::from_bytes(PNG)).unwrap();
    let id = stager.pending(&repr).unwrap().content_id.clone();
    let doc = Document::from_blocks(vec![Block::new(ImageData {
        src: repr,
        ..Default::default()
    })])
    .unwrap();

    let resolved = stager.resolve_all(&doc).await.unwrap();
    let expected = format!("https://cdn.example/uploads/posts/{id}.png");
    match resolved.blocks()[0].data() {
        BlockData::Image(img) => assert_eq!(img.src, expected),
        other => panic!("expected image block, got {other:?}"),
    }
    let on_disk = std::fs::read(dir.path().join("posts").join(format!("{id}.png"))).unwrap();
    assert_eq!(on_disk, PNG);
}
