//! Page-size normalization
//!
//! A page is fitted onto the target size with one uniform scale factor,
//! `min(targetW / origW, targetH / origH)`, and optionally centered. The
//! page content is wrapped in a `q … cm … Q` pair rather than rewritten.

use crate::page::rect_object;
use crate::types::{PagePlacement, Result};
use lopdf::{Dictionary, Document, Object, Stream};

/// Boxes that describe the old geometry and are dropped after rescaling
const STALE_BOXES: [&[u8]; 4] = [b"CropBox", b"TrimBox", b"BleedBox", b"ArtBox"];

/// Compute how a page of size `original` maps onto `target`.
///
/// Degenerate (zero-sized) pages keep a scale of 1 so the content is not
/// collapsed to a point.
pub fn compute_placement(original: (f32, f32), target: (f32, f32), center: bool) -> PagePlacement {
    let (orig_w, orig_h) = original;
    let (target_w, target_h) = target;

    let scale = if orig_w > 0.0 && orig_h > 0.0 {
        (target_w / orig_w).min(target_h / orig_h)
    } else {
        1.0
    };

    let (offset_x, offset_y) = if center {
        (
            (target_w - orig_w * scale) / 2.0,
            (target_h - orig_h * scale) / 2.0,
        )
    } else {
        (0.0, 0.0)
    };

    PagePlacement {
        scale,
        offset_x,
        offset_y,
        target,
    }
}

/// Rescale a page dictionary that already lives in `output`.
///
/// `media_box` is the page's original `[x0, y0, x1, y1]`; a non-zero origin
/// is folded into the translation so the visible area lands at the offset.
pub(crate) fn apply_placement(
    output: &mut Document,
    page: &mut Dictionary,
    media_box: [f32; 4],
    placement: &PagePlacement,
) -> Result<()> {
    let scale = placement.scale;
    let translate_x = placement.offset_x - scale * media_box[0];
    let translate_y = placement.offset_y - scale * media_box[1];

    let prefix = format!(
        "q {} 0 0 {} {} {} cm\n",
        scale, scale, translate_x, translate_y
    );
    let prefix_id = output.add_object(Stream::new(Dictionary::new(), prefix.into_bytes()));
    let suffix_id = output.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut contents = vec![Object::Reference(prefix_id)];
    contents.extend(existing_contents(output, page));
    contents.push(Object::Reference(suffix_id));
    page.set("Contents", Object::Array(contents));

    let (target_w, target_h) = placement.target;
    page.set("MediaBox", rect_object(target_w, target_h));
    for key in STALE_BOXES {
        page.remove(key);
    }

    Ok(())
}

/// Current content references of a page, flattening an indirect array
fn existing_contents(output: &mut Document, page: &Dictionary) -> Vec<Object> {
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match output.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Stream(stream)) => vec![Object::Reference(output.add_object(stream.clone()))],
        _ => Vec::new(),
    }
}
