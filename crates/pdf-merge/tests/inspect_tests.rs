use lopdf::{Dictionary, Document, Object, Stream};
use pdf_merge::inspect::*;
use pdf_merge::page::ContentsKind;

/// A4 document whose first page also draws a Form XObject
fn create_test_pdf(num_pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let form_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Form".to_vec())),
        ]),
        b"0 0 m 5 5 l S".to_vec(),
    ));

    let mut kids = Vec::new();
    for i in 0..num_pages {
        let content: &[u8] = if i == 0 {
            b"q /X0 Do Q"
        } else {
            b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET"
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));

        let mut resources = Dictionary::new();
        if i == 0 {
            resources.set(
                "XObject",
                Object::Dictionary(Dictionary::from_iter(vec![("X0", Object::Reference(form_id))])),
            );
        }

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(595.28),
                    Object::Real(841.89),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(Dictionary::from_iter(vec![(
        "Creator",
        Object::string_literal("expense tests"),
    )]));
    doc.trailer.set("Info", info_id);

    doc
}

#[test]
fn test_inspect_reports_pages_and_metadata() {
    let doc = create_test_pdf(2);

    let report = inspect_document(&doc, "test.pdf", 1234);

    assert_eq!(report.version, "1.5");
    assert_eq!(report.creator.as_deref(), Some("expense tests"));
    assert_eq!(report.file_size, 1234);
    assert_eq!(report.pages.len(), 2);

    let first = &report.pages[0];
    assert_eq!(first.number, 1);
    assert_eq!(first.paper, PaperClass::A4Portrait);
    assert!(first.contents.has_draw_operators);
    assert_eq!(first.contents.entry_type, Some("Reference"));
    assert_eq!(first.contents.resolved_type, Some("Stream"));
    assert_eq!(first.contents.streams.len(), 1);
    assert_eq!(first.contents.decoded_len, b"q /X0 Do Q".len());

    let resources = first.resources.as_ref().unwrap();
    assert_eq!(resources.xobjects, vec![("X0".to_string(), "Form".to_string())]);
}

#[test]
fn test_inspect_flags_missing_contents() {
    let mut doc = create_test_pdf(2);
    let page_id = doc.get_pages()[&2];
    doc.get_object_mut(page_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .remove(b"Contents");

    let report = inspect_document(&doc, "broken.pdf", 0);
    let second = &report.pages[1];

    assert_eq!(second.contents.kind, ContentsKind::Missing);
    assert_eq!(second.contents.entry_type, None);
    assert_eq!(second.contents.decoded_len, 0);
    assert!(!second.contents.has_draw_operators);
}

#[test]
fn test_views_render_page_facts() {
    let report = inspect_document(&create_test_pdf(2), "views.pdf", 10);

    let summary = SummaryView(&report).to_string();
    assert!(summary.contains("Pages: 2"));
    assert!(summary.contains("A4 portrait"));
    assert!(summary.contains("Pages with content: 0/2"));

    let sizes = SizesView(&report).to_string();
    assert!(sizes.contains("595.28 x 841.89"));

    let streams = ContentStreamsView(&report).to_string();
    assert!(streams.contains("filter none"));

    let deep = DeepView(&report).to_string();
    assert!(deep.contains("Contents entry: Reference"));
    assert!(deep.contains("XObject /X0: Form"));

    let detailed = DetailedView(&report).to_string();
    assert!(detailed.contains("Drawing operators: yes"));
    assert!(detailed.contains("Preview: q /X0 Do Q"));
}

#[tokio::test]
async fn test_inspect_file_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut doc = create_test_pdf(3);
    let mut writer = Vec::new();
    doc.save_to(&mut writer).unwrap();
    std::fs::write(&path, &writer).unwrap();

    let report = inspect_file(&path).await.unwrap();

    assert_eq!(report.pages.len(), 3);
    assert_eq!(report.file_size, writer.len());
    assert!(report.source.ends_with("doc.pdf"));
}

#[tokio::test]
async fn test_compare_files_reports_page_count() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("reference.pdf");
    let generated = dir.path().join("generated.pdf");
    for (path, pages) in [(&reference, 2), (&generated, 1)] {
        let mut writer = Vec::new();
        create_test_pdf(pages).save_to(&mut writer).unwrap();
        std::fs::write(path, writer).unwrap();
    }

    let same = pdf_merge::compare_files(&reference, &reference).await.unwrap();
    assert!(same.is_match());

    let comparison = pdf_merge::compare_files(&reference, &generated).await.unwrap();
    assert_eq!(
        comparison.differences,
        vec![Difference::PageCount { left: 2, right: 1 }]
    );
    let text = ComparisonView(&comparison).to_string();
    assert!(text.contains("A: "));
    assert!(text.contains("page count: 2 vs 1"));
}
