//! Shared test utilities and dta fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rbstata::pipeline::dta::{
    write_dta, DtaDataset, Release, ValueLabelSet, VarType, Variable, WriteOptions,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a small auto-style DataFrame
///
/// This DataFrame includes:
/// - `make`: String column
/// - `price`: Float64 with one missing value
/// - `mpg`: Int32
/// - `foreign`: Int8 indicator carrying a value label
pub fn create_test_dataframe() -> DataFrame {
    df! {
        "make" => ["AMC Concord", "Buick Century", "Datsun 210", "VW Rabbit"],
        "price" => [Some(4099.0f64), None, Some(4589.0), Some(4697.0)],
        "mpg" => [22i32, 20, 35, 25],
        "foreign" => [0i8, 0, 1, 1],
    }
    .unwrap()
}

fn variable(name: &str, var_type: VarType, format: &str, value_label: &str, label: &str) -> Variable {
    Variable {
        name: name.to_string(),
        var_type,
        format: format.to_string(),
        value_label: value_label.to_string(),
        label: label.to_string(),
    }
}

/// The auto-style frame with labels, formats and a value label table
pub fn create_test_dataset() -> DtaDataset {
    let mut dataset = DtaDataset::from_frame(create_test_dataframe());
    dataset.data_label = "1978 automobile data".to_string();
    dataset.variables = vec![
        variable("make", VarType::Str(18), "%-18s", "", "Make and model"),
        variable("price", VarType::Double, "%8.0gc", "", "Price"),
        variable("mpg", VarType::Long, "%8.0g", "", "Mileage (mpg)"),
        variable("foreign", VarType::Byte, "%8.0g", "origin", "Car origin"),
    ];
    dataset.value_labels = vec![ValueLabelSet {
        name: "origin".to_string(),
        entries: vec![(0, "Domestic".to_string()), (1, "Foreign".to_string())],
    }];
    dataset
}

/// A dataset whose text only Unicode releases can store
pub fn create_unicode_dataset() -> DtaDataset {
    let frame = df! {
        "city" => ["Zürich", "北京", "Oslo"],
        "population" => [421_878i32, 21_540_000, 709_037],
    }
    .unwrap();
    let mut dataset = DtaDataset::from_frame(frame);
    dataset.data_label = "Städte".to_string();
    dataset.variables = vec![
        variable("city", VarType::Str(6), "%9s", "", "Stadt"),
        variable("population", VarType::Long, "%12.0g", "", "Einwohner"),
    ];
    dataset
}

/// A dataset whose variable and value label names are not ASCII
pub fn create_unicode_names_dataset() -> DtaDataset {
    let frame = df! {
        "城市" => ["Zurich", "Oslo"],
        "prénom" => ["Ada", "Grace"],
        "größe" => [1i8, 2],
    }
    .unwrap();
    let mut dataset = DtaDataset::from_frame(frame);
    dataset.variables = vec![
        variable("城市", VarType::Str(6), "%9s", "", "City"),
        variable("prénom", VarType::Str(5), "%9s", "", "First name"),
        variable("größe", VarType::Byte, "%8.0g", "größen", "Size"),
    ];
    dataset.value_labels = vec![ValueLabelSet {
        name: "größen".to_string(),
        entries: vec![(1, "small".to_string()), (2, "large".to_string())],
    }];
    dataset
}

/// Write `dataset` as `name` inside `dir` at the given release
pub fn write_fixture(dir: &Path, name: &str, dataset: &DtaDataset, release: Release) -> PathBuf {
    let path = dir.join(name);
    let options = WriteOptions {
        release: Some(release),
        ..Default::default()
    };
    write_dta(&path, dataset, &options).unwrap();
    path
}

/// Create a temp dir holding the auto-style dataset as a release 118 file
pub fn create_temp_dta(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_fixture(temp_dir.path(), name, &create_test_dataset(), Release::V118);
    (temp_dir, path)
}

/// Create a larger random dataset for stress tests
pub fn create_large_test_dataset(rows: usize, cols: usize) -> DtaDataset {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    let mut columns: Vec<Column> = Vec::with_capacity(cols + 1);
    let ids: Vec<i32> = (0..rows as i32).collect();
    columns.push(Column::new("id".into(), ids));

    for i in 0..cols {
        let values: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
        columns.push(Column::new(format!("x{}", i).into(), values));
    }

    DtaDataset::from_frame(DataFrame::new(columns).unwrap())
}
