//! A MapReduce-compatible implementation of `grep`.
//!
//! Keys are input references; values are `<line number>\t<line>`. The
//! reduced value lists the matches of one input in line order, separated by
//! `; `.

use crate::*;
use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;

use super::decode_aux;

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
struct Args {
    #[clap(short, long, value_parser)]
    term: String,
}

pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let args = Args::try_parse_from(decode_aux(&aux)?)?;
    let term = args.term;

    let s = String::from_utf8(kv.value.as_ref().into())?;
    let matches = s
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(&term))
        .map(|(i, line)| format!("{}\t{}", i + 1, line))
        .collect::<Vec<_>>();

    let input = kv.key;
    let iter = matches
        .into_iter()
        .map(move |value| Ok(KeyValue::new(input.clone(), value)));
    Ok(Box::new(iter))
}

pub fn reduce(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let mut lines = Vec::new();
    for value in values {
        let value = String::from_utf8(value.to_vec())?;
        let (line_no, line) = value
            .split_once('\t')
            .and_then(|(n, line)| Some((n.parse::<u64>().ok()?, line.to_string())))
            .with_context(|| format!("malformed grep value {:?} for {:?}", value, key))?;
        lines.push((line_no, line));
    }
    lines.sort();

    let out = lines
        .into_iter()
        .map(|(n, line)| format!("{n}: {line}"))
        .collect::<Vec<_>>()
        .join("; ");
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::encode_aux;

    fn aux(term: &str) -> Bytes {
        encode_aux(&["--term".to_string(), term.to_string()]).unwrap()
    }

    #[test]
    fn map_keeps_matching_lines_with_numbers() {
        let kv = KeyValue::new("doc", "alpha\nneedle one\nbeta\nneedle two");
        let out: Vec<KeyValue> = map(kv, aux("needle"))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            out,
            vec![
                KeyValue::new("doc", "2\tneedle one"),
                KeyValue::new("doc", "4\tneedle two"),
            ]
        );
    }

    #[test]
    fn map_requires_a_term() {
        assert!(map(KeyValue::new("doc", "x"), Bytes::new()).is_err());
    }

    #[test]
    fn reduce_orders_by_line_number() {
        let values = vec![Bytes::from("10\tlate"), Bytes::from("2\tearly")];
        let out = reduce(Bytes::from("doc"), Box::new(values.into_iter()), Bytes::new()).unwrap();
        assert_eq!(out, "2: early; 10: late");
    }
}
