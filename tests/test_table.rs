//! Tests for accumulating, normalizing and persisting the results table.

mod common;

use common::*;

fn sample_table() -> anyhow::Result<ResultsTable> {
    let mut acc = RowAccumulator::new();
    acc.push("a.jpg", counts(&[("car", 2), ("person", 1)]))?;
    acc.push("b.jpg", counts(&[("dog", 3)]))?;
    acc.push("c.jpg", ClassCountMap::new())?;
    Ok(acc.finish())
}

#[test]
fn test_normalized_shape() -> anyhow::Result<()> {
    let table = sample_table()?;

    assert_eq!(table.len(), 3);
    assert_eq!(table.columns(), ["car", "dog", "person"]);
    for row in table.rows() {
        assert_eq!(row.counts.len(), table.columns().len());
    }

    assert_eq!(table.row("a.jpg").map(|r| r.counts.clone()), Some(vec![2, 0, 1]));
    assert_eq!(table.row("b.jpg").map(|r| r.counts.clone()), Some(vec![0, 3, 0]));
    assert_eq!(table.row("c.jpg").map(|r| r.counts.clone()), Some(vec![0, 0, 0]));
    Ok(())
}

#[test]
fn test_rows_keep_insertion_order() -> anyhow::Result<()> {
    let mut acc = RowAccumulator::new();
    for name in ["z.jpg", "a.jpg", "m.jpg"] {
        acc.push(name, ClassCountMap::new())?;
    }
    let table = acc.finish();

    let images: Vec<&str> = table.rows().iter().map(|r| r.image.as_str()).collect();
    assert_eq!(images, ["z.jpg", "a.jpg", "m.jpg"]);
    Ok(())
}

#[test]
fn test_columns_grow_monotonically() -> anyhow::Result<()> {
    let mut acc = RowAccumulator::new();
    acc.push("a.jpg", counts(&[("car", 1)]))?;
    assert_eq!(acc.columns().collect::<Vec<_>>(), ["car"]);

    acc.push("b.jpg", counts(&[("person", 2)]))?;
    assert_eq!(acc.columns().collect::<Vec<_>>(), ["car", "person"]);

    acc.push("c.jpg", ClassCountMap::new())?;
    assert_eq!(acc.columns().collect::<Vec<_>>(), ["car", "person"]);
    assert_eq!(acc.len(), 3);
    Ok(())
}

#[test]
fn test_duplicate_row_is_rejected() -> anyhow::Result<()> {
    let mut acc = RowAccumulator::new();
    acc.push("a.jpg", counts(&[("car", 1)]))?;

    let err = acc.push("a.jpg", counts(&[("car", 5)])).unwrap_err();
    assert!(matches!(err, PlcError::DuplicateRow(ref name) if name == "a.jpg"));
    assert_eq!(acc.len(), 1);
    Ok(())
}

#[test]
fn test_count_lookup() -> anyhow::Result<()> {
    let table = sample_table()?;

    assert_eq!(table.count("a.jpg", "car"), Some(2));
    assert_eq!(table.count("b.jpg", "car"), Some(0));
    assert_eq!(table.count("a.jpg", "bicycle"), Some(0));
    assert_eq!(table.count("missing.jpg", "car"), None);
    Ok(())
}

#[test]
fn test_delimited_layout() -> anyhow::Result<()> {
    let table = sample_table()?;
    let text = table.to_delimited_string(',');

    assert_eq!(
        text,
        ",car,dog,person\na.jpg,2,0,1\nb.jpg,0,3,0\nc.jpg,0,0,0\n"
    );
    Ok(())
}

#[test]
fn test_empty_table_layout() {
    let table = RowAccumulator::new().finish();
    assert!(table.is_empty());
    assert_eq!(table.to_delimited_string(','), "\n");

    let parsed = ResultsTable::from_delimited_str("\n", ',').expect("parse empty table");
    assert_eq!(parsed, table);
}

#[test]
fn test_file_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("results.csv");

    let table = sample_table()?;
    table.write_delimited(&path, ',')?;
    let read_back = ResultsTable::read_delimited(&path, ',')?;

    assert_eq!(read_back.to_map(), table.to_map());
    assert_eq!(read_back, table);
    Ok(())
}

#[test]
fn test_round_trip_with_awkward_names_and_delimiter() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("results.tsv");

    let mut acc = RowAccumulator::new();
    acc.push("field, north.jpg", counts(&[("car", 1)]))?;
    acc.push("say \"cheese\".jpg", counts(&[("person", 2)]))?;
    acc.push("tab\there.jpg", counts(&[("car", 4)]))?;
    let table = acc.finish();

    for delimiter in [',', '\t', ';'] {
        table.write_delimited(&path, delimiter)?;
        let read_back = ResultsTable::read_delimited(&path, delimiter)?;
        assert_eq!(read_back.to_map(), table.to_map(), "delimiter {:?}", delimiter);
    }
    Ok(())
}

#[test]
fn test_to_map_fills_zeros() -> anyhow::Result<()> {
    let map = sample_table()?.to_map();

    assert_eq!(map.len(), 3);
    assert_eq!(map["b.jpg"], counts(&[("car", 0), ("dog", 3), ("person", 0)]));
    Ok(())
}

#[test]
fn test_reading_malformed_tables() {
    let wrong_width = ResultsTable::from_delimited_str(",car\na.jpg,1,2\n", ',').unwrap_err();
    assert_eq!(wrong_width.0, 2);

    let bad_count = ResultsTable::from_delimited_str(",car\na.jpg,1\nb.jpg,x\n", ',').unwrap_err();
    assert_eq!(bad_count.0, 3);

    let duplicate = ResultsTable::from_delimited_str(",car\na.jpg,1\na.jpg,2\n", ',').unwrap_err();
    assert_eq!(duplicate.0, 3);

    assert!(ResultsTable::from_delimited_str("", ',').is_err());
    assert!(ResultsTable::from_delimited_str(",car\n\"a.jpg,1\n", ',').is_err());
}

#[test]
fn test_reading_missing_file() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let err = ResultsTable::read_delimited(&dir.path().join("nope.csv"), ',').unwrap_err();
    assert!(matches!(err, PlcError::Io { .. }));
}
