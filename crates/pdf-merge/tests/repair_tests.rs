use lopdf::{Dictionary, Document, Object, Stream};
use pdf_merge::*;

fn create_test_pdf(num_pages: usize) -> Document {
    let mut doc = Document::with_version("1.7");

    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            b"0 0 m 100 100 l S".to_vec(),
        ));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
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

    doc
}

fn to_bytes(doc: Document) -> Vec<u8> {
    document_to_bytes(doc).unwrap()
}

fn without_contents(mut doc: Document, page_number: u32) -> Document {
    let page_id = doc.get_pages()[&page_number];
    doc.get_object_mut(page_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .remove(b"Contents");
    doc
}

#[test]
fn test_reembed_draws_each_page_through_xobject() {
    let bytes = to_bytes(create_test_pdf(2));

    let repaired = repair::reembed_pages(&bytes).unwrap();
    let doc = Document::load_mem(&repaired).unwrap();

    assert_eq!(doc.get_pages().len(), 2);
    for (_, page_id) in doc.get_pages() {
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let form_id = xobjects.get(b"P0").unwrap().as_reference().unwrap();
        let form = doc.get_object(form_id).unwrap().as_stream().unwrap();

        assert_eq!(form.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Form");
        assert_eq!(form.content, b"0 0 m 100 100 l S".to_vec());
        assert_eq!(
            pdf_merge::page::get_page_dimensions(&doc, page_id),
            (612.0, 792.0)
        );
    }
}

#[test]
fn test_repair_prefers_reembed() {
    let bytes = to_bytes(without_contents(create_test_pdf(3), 2));

    let report = repair_document(&bytes, &RepairStrategy::DEFAULT_ORDER).unwrap();

    assert_eq!(report.strategy, RepairStrategy::Reembed);
    assert_eq!(report.attempts.len(), 1);
    assert!(report.all_pages_have_content);
    assert_eq!(Document::load_mem(&report.bytes).unwrap().get_pages().len(), 3);
}

#[test]
fn test_resave_keeps_missing_content_missing() {
    let bytes = to_bytes(without_contents(create_test_pdf(2), 1));

    let report = repair_document(&bytes, &[RepairStrategy::Resave]).unwrap();

    assert_eq!(report.strategy, RepairStrategy::Resave);
    assert!(!report.all_pages_have_content);
}

#[test]
fn test_unreadable_input_fails_every_strategy() {
    let result = repair_document(b"definitely not a pdf", &RepairStrategy::DEFAULT_ORDER);
    assert!(matches!(result, Err(MergeError::RepairFailed)));
}

#[test]
fn test_reload_probe_counts_content_at_each_step() {
    let bytes = to_bytes(without_contents(create_test_pdf(3), 3));

    let probe = reload_probe(&bytes).unwrap();

    assert_eq!(probe.pages, 3);
    assert_eq!(probe.original_with_content, 2);
    assert_eq!(probe.reloaded_with_content, 2);
    // Strict copy fails, the fallback substitutes an empty stream
    assert_eq!(probe.merged_with_content, 3);
    assert!(Document::load_mem(&probe.merged_bytes).is_ok());
}

/// Content stream with a filter lopdf has no decoder for
fn run_length_stream() -> Stream {
    Stream::new(
        Dictionary::from_iter(vec![("Filter", Object::Name(b"RunLengthDecode".to_vec()))]),
        vec![0x02, b'a', b'b', b'c', 0x80],
    )
}

fn set_contents(doc: &mut Document, page_number: u32, contents: Object) {
    let page_id = doc.get_pages()[&page_number];
    doc.get_object_mut(page_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("Contents", contents);
}

#[test]
fn test_reembed_keeps_filter_of_undecodable_stream() {
    let mut doc = create_test_pdf(1);
    let encoded_id = doc.add_object(run_length_stream());
    set_contents(&mut doc, 1, Object::Reference(encoded_id));

    let repaired = repair::reembed_pages(&to_bytes(doc)).unwrap();
    let doc = Document::load_mem(&repaired).unwrap();

    let page = doc.get_dictionary(doc.get_pages()[&1]).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let form_id = xobjects.get(b"P0").unwrap().as_reference().unwrap();
    let form = doc.get_object(form_id).unwrap().as_stream().unwrap();

    assert_eq!(
        form.dict.get(b"Filter").unwrap().as_name().unwrap(),
        b"RunLengthDecode"
    );
    assert_eq!(form.content, vec![0x02, b'a', b'b', b'c', 0x80]);
}

#[test]
fn test_reembed_leaves_out_pages_it_cannot_rebuild() {
    let mut doc = create_test_pdf(3);
    let encoded_id = doc.add_object(run_length_stream());
    let plain_id = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m 5 5 l S".to_vec()));
    set_contents(
        &mut doc,
        2,
        Object::Array(vec![
            Object::Reference(encoded_id),
            Object::Reference(plain_id),
        ]),
    );

    let repaired = repair::reembed_pages(&to_bytes(doc)).unwrap();
    let doc = Document::load_mem(&repaired).unwrap();

    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_reembed_fails_when_no_page_can_be_rebuilt() {
    let mut doc = create_test_pdf(1);
    let encoded_id = doc.add_object(run_length_stream());
    let plain_id = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m 5 5 l S".to_vec()));
    set_contents(
        &mut doc,
        1,
        Object::Array(vec![
            Object::Reference(plain_id),
            Object::Reference(encoded_id),
        ]),
    );

    match repair::reembed_pages(&to_bytes(doc)) {
        Err(MergeError::UndecodableContent { filter }) => assert_eq!(filter, "RunLengthDecode"),
        other => panic!("Expected UndecodableContent, got {:?}", other.map(|b| b.len())),
    }
}
