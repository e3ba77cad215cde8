// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use proptest::prelude::*;
use threadloom::thread::{Segmenter, SegmenterConfig, Tweet};

fn segmenter(max: usize, template: &str) -> Segmenter {
    Segmenter::new(&SegmenterConfig {
        max_tweet_length: max,
        numbering_template: template.to_string(),
    })
    .unwrap()
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn bodies(tweets: &[Tweet]) -> String {
    tweets
        .iter()
        .map(|t| t.body.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn assert_well_formed(tweets: &[Tweet], max: usize) {
    for (i, tweet) in tweets.iter().enumerate() {
        assert!(
            tweet.text.chars().count() <= max,
            "tweet {} has {} chars",
            i + 1,
            tweet.text.chars().count()
        );
        assert_eq!(tweet.char_count, tweet.text.chars().count());
        assert_eq!(tweet.index, i + 1);
        assert_eq!(tweet.total, tweets.len());
        assert!(!tweet.body.trim().is_empty());
    }
}

#[test]
fn test_thousand_character_example() {
    let sentence = "Ownership rules let the compiler free memory at the right time. ";
    let text: String = sentence.repeat(20).chars().take(1000).collect();
    let tweets = segmenter(280, "{i}/{n}").segment(&text).unwrap();

    assert!(tweets.len() >= 4);
    assert_well_formed(&tweets, 280);
    assert_eq!(squash(&bodies(&tweets)), squash(&text));
    assert!(tweets[0].text.ends_with(&format!("1/{}", tweets.len())));
}

#[test]
fn test_custom_template() {
    let text = "Sentence number one is here. ".repeat(30);
    let tweets = segmenter(100, "({i} of {n})").segment(&text).unwrap();
    let last = tweets.last().unwrap();
    assert!(last.text.ends_with(&format!("({} of {})", tweets.len(), tweets.len())));
    assert_well_formed(&tweets, 100);
}

#[test]
fn test_long_word_is_hard_cut() {
    let word = "x".repeat(700);
    let tweets = segmenter(120, "{i}/{n}").segment(&word).unwrap();
    assert_well_formed(&tweets, 120);
    assert_eq!(squash(&bodies(&tweets)), word);
}

#[test]
fn test_multibyte_text_counts_characters() {
    let text = "こんにちは世界。これはテストです。".repeat(40);
    let tweets = segmenter(140, "{i}/{n}").segment(&text).unwrap();
    assert_well_formed(&tweets, 140);
    assert_eq!(squash(&bodies(&tweets)), squash(&text));
}

#[test]
fn test_units_keep_their_order() {
    let units = vec![
        "First point about memory safety.".to_string(),
        "Second point about fearless concurrency.".to_string(),
        "Third point about zero-cost abstractions.".to_string(),
    ];
    let tweets = segmenter(280, "{i}/{n}").segment_units(&units).unwrap();
    assert_eq!(tweets.len(), 3);
    for (tweet, unit) in tweets.iter().zip(&units) {
        assert_eq!(&tweet.body, unit);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sentences_respect_length_and_order(
        text in "[A-Za-z]{1,12}([ ,.!?]{1,2}[A-Za-z]{1,12}){0,300}",
        max in 30usize..400,
    ) {
        let seg = segmenter(max, "{i}/{n}");
        let tweets = seg.segment(&text).unwrap();
        assert_well_formed(&tweets, max);
        prop_assert_eq!(squash(&bodies(&tweets)), squash(&text));
    }

    #[test]
    fn prop_arbitrary_unicode(
        text in "\\PC{1,1500}",
        max in 40usize..300,
    ) {
        prop_assume!(!text.trim().is_empty());
        let seg = segmenter(max, "[{i}/{n}]");
        let tweets = seg.segment(&text).unwrap();
        assert_well_formed(&tweets, max);
        prop_assert_eq!(squash(&bodies(&tweets)), squash(&text));
    }

    #[test]
    fn prop_units_never_merge(
        units in prop::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,40}\\.", 1..12),
        max in 60usize..300,
    ) {
        let seg = segmenter(max, "{i}/{n}");
        let tweets = seg.segment_units(&units).unwrap();
        assert_well_formed(&tweets, max);
        prop_assert!(tweets.len() >= units.len());
        let joined = units.join(" ");
        prop_assert_eq!(squash(&bodies(&tweets)), squash(&joined));
    }
}
