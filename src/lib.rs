//! Interactive table engine for extracted shipment records: column registry,
//! value formatting, grid rendering, column reorder and visibility, export of
//! the visible table, and a JSON inspector over the raw records.

pub mod columns;
pub mod controller;
pub mod domain;
pub mod export;
pub mod format;
pub mod grid;
pub mod inputter;
pub mod json_view;
pub mod model;
pub mod record;
pub mod reorder;
pub mod table;
pub mod ui;
