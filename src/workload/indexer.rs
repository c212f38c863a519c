//! An inverted index: for every word, the inputs it appears in.

use std::collections::BTreeSet;

use crate::*;
use anyhow::Result;
use bytes::Bytes;

pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let s = String::from_utf8(kv.value.as_ref().into())?;
    let words: BTreeSet<String> = s
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let document = kv.key;
    let iter = words
        .into_iter()
        .map(move |word| Ok(KeyValue::new(word, document.clone())));
    Ok(Box::new(iter))
}

/// Yields `<number of inputs> <input,input,...>` with inputs sorted.
pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let documents = values
        .map(|v| String::from_utf8(v.to_vec()))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let listed = documents.iter().map(String::as_str).collect::<Vec<_>>().join(",");
    Ok(Bytes::from(format!("{} {}", documents.len(), listed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_emits_each_word_once() {
        let out: Vec<KeyValue> = map(KeyValue::new("a.txt", "b a b"), Bytes::new())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(out, vec![KeyValue::new("a", "a.txt"), KeyValue::new("b", "a.txt")]);
    }

    #[test]
    fn reduce_lists_sorted_distinct_inputs() {
        let values = vec![Bytes::from("b.txt"), Bytes::from("a.txt"), Bytes::from("b.txt")];
        let out = reduce(Bytes::from("w"), Box::new(values.into_iter()), Bytes::new()).unwrap();
        assert_eq!(out, "2 a.txt,b.txt");
    }
}
