//! Property-based tests for segmentation and offset recovery
//!
//! These verify that no text is lost or duplicated by segmentation and that
//! recovered offsets are always in bounds and monotonic.

use proptest::prelude::*;
use segtran_core::segmenter::strip_markers;
use segtran_core::{compute_offsets, segment, Segmenter};

/// Strategy for sentences mixing CJK and ASCII prose
fn sentence_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[一二三四五六七八九十研究方法结果数据分析]{1,60}[。！？]",
        "[a-zA-Z0-9 ,]{1,80}[.!?]",
        "[甲乙丙丁戊己庚辛，、]{1,120}",
    ]
}

/// Strategy for paragraphs built from sentences, optionally indented
fn paragraph_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(sentence_strategy(), 1..8),
        prop::bool::ANY,
        prop::bool::ANY,
    )
        .prop_map(|(sentences, spaced, indented)| {
            let body = sentences.join(if spaced { " " } else { "" });
            if indented {
                format!("    {}", body)
            } else {
                body
            }
        })
}

/// Strategy for whole documents with irregular paragraph spacing
fn document_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec((paragraph_strategy(), 2usize..4), 1..12).prop_map(|paragraphs| {
        let mut text = String::new();
        for (i, (paragraph, newlines)) in paragraphs.iter().enumerate() {
            if i > 0 {
                text.push_str(&"\n".repeat(*newlines));
            }
            text.push_str(paragraph);
        }
        text
    })
}

fn non_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

proptest! {
    #[test]
    fn segmentation_preserves_content(text in document_strategy(), max in 10usize..400) {
        let segments = segment(&text, max);
        let rebuilt: String = segments
            .iter()
            .map(|s| strip_markers(&s.raw_text).into_owned())
            .collect::<Vec<_>>()
            .join("\n\n");
        prop_assert_eq!(non_whitespace(&rebuilt), non_whitespace(&text));
    }

    #[test]
    fn segments_respect_size_limit(text in document_strategy(), max in 10usize..400) {
        let segments = segment(&text, max);
        for (i, s) in segments.iter().enumerate() {
            prop_assert_eq!(s.index, i);
            prop_assert!(s.char_len() <= max, "segment {} has {} chars > {}", i, s.char_len(), max);
        }
    }

    #[test]
    fn segmentation_is_deterministic(text in document_strategy(), max in 10usize..400) {
        prop_assert_eq!(segment(&text, max), segment(&text, max));
    }

    #[test]
    fn offsets_are_monotonic_and_in_bounds(text in document_strategy(), max in 10usize..400) {
        let segments = Segmenter::new(max).segment(&text);
        let ranges = compute_offsets(&text, &segments);
        let total = text.chars().count();

        prop_assert_eq!(ranges.len(), segments.len());
        let mut previous_start = 0;
        for range in &ranges {
            prop_assert!(range.start <= range.end);
            prop_assert!(range.end <= total);
            prop_assert!(range.start >= previous_start);
            previous_start = range.start;
        }
        if let Some(last) = ranges.last() {
            prop_assert_eq!(last.end, total);
        }
    }

    #[test]
    fn offsets_stay_in_bounds_for_unrelated_segments(
        original in "[a-z一二三 \n]{0,200}",
        text in document_strategy(),
        max in 10usize..200,
    ) {
        let segments = segment(&text, max);
        let ranges = compute_offsets(&original, &segments);
        let total = original.chars().count();
        let mut previous_start = 0;
        for range in &ranges {
            prop_assert!(range.start <= range.end && range.end <= total);
            prop_assert!(range.start >= previous_start);
            previous_start = range.start;
        }
    }
}

#[test]
fn nine_thousand_characters_yield_multiple_segments() {
    let paragraph = "本研究采用定量分析方法对样本数据进行了系统考察。".repeat(10);
    let text = vec![paragraph; 38].join("\n\n");
    assert!(text.chars().count() >= 9000);

    let segments = segment(&text, 4000);
    assert!(segments.len() >= 2);
    assert!(segments.iter().all(|s| s.char_len() <= 4000));
    assert!(segments[0].raw_text.starts_with(&format!("[Part 1/{}]", segments.len())));
}
