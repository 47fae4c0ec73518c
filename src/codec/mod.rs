//! Element-body codecs (components 6 and 7): [`binary`] for the two
//! binary encodings, [`ascii`] for the text encoding. Both operate on an
//! already-parsed [`crate::types::element::ElementSchema`] and produce or
//! consume a [`crate::table::RowTable`]; [`crate::container::Container`]
//! is the only caller that picks between them, based on the header's
//! declared [`crate::header::Encoding`].

pub mod ascii;
pub mod binary;

use indexmap::IndexMap;

use crate::table::Column;
use crate::types::element::ElementSchema;
use crate::types::property::PropertyType;

fn new_column_for(prop_type: PropertyType, capacity: usize) -> Column {
    match prop_type {
        PropertyType::Scalar(ty) => Column::with_capacity_scalar(ty, capacity),
        PropertyType::List { value_type, .. } => Column::with_capacity_list(value_type, capacity),
    }
}

/// Allocates one empty, appropriately-shaped (scalar or list) [`Column`]
/// per property in `schema`, pre-sized for `capacity` rows.
pub(crate) fn empty_columns(schema: &ElementSchema, capacity: usize) -> IndexMap<String, Column> {
    schema
        .properties
        .values()
        .map(|p| (p.name.clone(), new_column_for(p.data_type, capacity)))
        .collect()
}
