//! Record types shared by the integration tests

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sheet_records::{
    DynamicColumns, ExcelEnum, ExcelRow, FieldDescriptor, FieldKind, FieldValue, FromExcelRow,
    SheetResult,
};
use std::borrow::Cow;

// ═══════════════════════════════════════════════════════════════════════════
// CUSTOMER (scalar fields of every kind)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Category {
    #[default]
    CategoryA,
    CategoryB,
}

impl ExcelEnum for Category {
    const SYMBOLS: &'static [&'static str] = &["CategoryA", "CategoryB"];

    fn symbol(&self) -> &'static str {
        match self {
            Category::CategoryA => "CategoryA",
            Category::CategoryB => "CategoryB",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "CategoryA" => Some(Category::CategoryA),
            "CategoryB" => Some(Category::CategoryB),
            _ => None,
        }
    }
}

pub static CUSTOMER_FIELDS: [FieldDescriptor; 8] = [
    FieldDescriptor::new("SheetName", FieldKind::String),
    FieldDescriptor::new("Address", FieldKind::String),
    FieldDescriptor::new("CustomerId", FieldKind::Integer).with_display_name("Customer Id"),
    FieldDescriptor::new("IsActive", FieldKind::Boolean),
    FieldDescriptor::new("Balance", FieldKind::Decimal),
    FieldDescriptor::new("Category", FieldKind::Enum(Category::SYMBOLS)),
    FieldDescriptor::new("Joined", FieldKind::DateTime),
    FieldDescriptor::new("Note", FieldKind::Nullable(&FieldKind::String)),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub address: String,
    pub customer_id: i32,
    pub is_active: bool,
    pub balance: Decimal,
    pub category: Category,
    pub joined: NaiveDateTime,
    pub note: Option<String>,
}

impl Default for Customer {
    fn default() -> Self {
        Self {
            address: String::new(),
            customer_id: 0,
            is_active: false,
            balance: Decimal::ZERO,
            category: Category::default(),
            joined: NaiveDateTime::default(),
            note: None,
        }
    }
}

impl ExcelRow for Customer {
    fn sheet_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("Customers")
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        &CUSTOMER_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "Address" => self.address.as_str().into(),
            "CustomerId" => self.customer_id.into(),
            "IsActive" => self.is_active.into(),
            "Balance" => self.balance.into(),
            "Category" => FieldValue::Enum(self.category.symbol().to_string()),
            "Joined" => self.joined.into(),
            "Note" => self.note.clone().into(),
            _ => FieldValue::Empty,
        }
    }
}

impl FromExcelRow for Customer {
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()> {
        match field {
            "Address" => self.address = value.try_into()?,
            "CustomerId" => self.customer_id = value.try_into()?,
            "IsActive" => self.is_active = value.try_into()?,
            "Balance" => self.balance = value.try_into()?,
            "Category" => self.category = value.into_enum()?,
            "Joined" => self.joined = value.try_into()?,
            "Note" => self.note = value.try_into()?,
            _ => {}
        }
        Ok(())
    }
}

pub fn sample_customer() -> Customer {
    Customer {
        address: "123 Fake".to_string(),
        customer_id: 1,
        is_active: true,
        balance: Decimal::new(10000, 2),
        category: Category::CategoryA,
        joined: NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap(),
        note: None,
    }
}

pub fn numbered_customer(id: i32) -> Customer {
    Customer {
        address: format!("{} Main Street", id),
        customer_id: id,
        is_active: id % 2 == 0,
        balance: Decimal::new(i64::from(id) * 150, 2),
        category: if id % 3 == 0 {
            Category::CategoryB
        } else {
            Category::CategoryA
        },
        note: (id % 5 == 0).then(|| format!("note {}", id)),
        ..sample_customer()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DYNAMIC COLUMNS
// ═══════════════════════════════════════════════════════════════════════════

pub static TAGGED_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new("SheetName", FieldKind::String),
    FieldDescriptor::new("Id", FieldKind::Integer),
    FieldDescriptor::new("Extras", FieldKind::DynamicColumns),
];

/// Record whose extra columns come from a map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tagged {
    pub id: i64,
    pub extras: DynamicColumns,
}

impl ExcelRow for Tagged {
    fn sheet_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("Tagged")
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        &TAGGED_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "Id" => self.id.into(),
            "Extras" => self.extras.clone().into(),
            _ => FieldValue::Empty,
        }
    }
}

impl FromExcelRow for Tagged {
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()> {
        match field {
            "Id" => self.id = value.try_into()?,
            "Extras" => self.extras = value.try_into()?,
            _ => {}
        }
        Ok(())
    }
}

pub static TAGGED_FLAT_FIELDS: [FieldDescriptor; 5] = [
    FieldDescriptor::new("SheetName", FieldKind::String),
    FieldDescriptor::new("Id", FieldKind::Integer),
    FieldDescriptor::new("Key1", FieldKind::String),
    FieldDescriptor::new("Key2", FieldKind::String),
    FieldDescriptor::new("Key3", FieldKind::String),
];

/// Same sheet as [`Tagged`], with the map keys declared as scalar fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggedFlat {
    pub id: i64,
    pub key1: String,
    pub key2: String,
    pub key3: String,
}

impl ExcelRow for TaggedFlat {
    fn sheet_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("Tagged")
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        &TAGGED_FLAT_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "Id" => self.id.into(),
            "Key1" => self.key1.as_str().into(),
            "Key2" => self.key2.as_str().into(),
            "Key3" => self.key3.as_str().into(),
            _ => FieldValue::Empty,
        }
    }
}

impl FromExcelRow for TaggedFlat {
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()> {
        match field {
            "Id" => self.id = value.try_into()?,
            "Key1" => self.key1 = value.try_into()?,
            "Key2" => self.key2 = value.try_into()?,
            "Key3" => self.key3 = value.try_into()?,
            _ => {}
        }
        Ok(())
    }
}

pub fn key_values() -> DynamicColumns {
    let mut extras = DynamicColumns::new();
    extras.insert("Key1".to_string(), "Value1".to_string());
    extras.insert("Key2".to_string(), "Value2".to_string());
    extras.insert("Key3".to_string(), "Value3".to_string());
    extras
}

// ═══════════════════════════════════════════════════════════════════════════
// TWO SHEETS
// ═══════════════════════════════════════════════════════════════════════════

pub static FIRST_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new("SheetName", FieldKind::String),
    FieldDescriptor::new("Name", FieldKind::String),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirstSheetRow {
    pub name: String,
}

impl ExcelRow for FirstSheetRow {
    fn sheet_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("Sheet1")
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        &FIRST_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "Name" => self.name.as_str().into(),
            _ => FieldValue::Empty,
        }
    }
}

impl FromExcelRow for FirstSheetRow {
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()> {
        if field == "Name" {
            self.name = value.try_into()?;
        }
        Ok(())
    }
}

/// Same fields as [`FirstSheetRow`] on a sheet whose name differs only by case
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LowerSheetRow {
    pub name: String,
}

impl ExcelRow for LowerSheetRow {
    fn sheet_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("sheet1")
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        &FIRST_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "Name" => self.name.as_str().into(),
            _ => FieldValue::Empty,
        }
    }
}

pub static SECOND_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new("SheetName", FieldKind::String),
    FieldDescriptor::new("Name", FieldKind::String),
    FieldDescriptor::new("Score", FieldKind::Float),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondSheetRow {
    pub name: String,
    pub score: f64,
}

impl ExcelRow for SecondSheetRow {
    fn sheet_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("Sheet2")
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        &SECOND_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "Name" => self.name.as_str().into(),
            "Score" => self.score.into(),
            _ => FieldValue::Empty,
        }
    }
}

impl FromExcelRow for SecondSheetRow {
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()> {
        match field {
            "Name" => self.name = value.try_into()?,
            "Score" => self.score = value.try_into()?,
            _ => {}
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DATES AND AMOUNTS
// ═══════════════════════════════════════════════════════════════════════════

pub static LEDGER_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::new("SheetName", FieldKind::String),
    FieldDescriptor::new("Posted", FieldKind::Nullable(&FieldKind::DateTime)),
    FieldDescriptor::new("Amount", FieldKind::Decimal),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerEntry {
    pub posted: Option<NaiveDateTime>,
    pub amount: Decimal,
}

impl ExcelRow for LedgerEntry {
    fn sheet_name(&self) -> Cow<'_, str> {
        Cow::Borrowed("Ledger")
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        &LEDGER_FIELDS
    }

    fn field_value(&self, field: &str) -> FieldValue {
        match field {
            "Posted" => self.posted.into(),
            "Amount" => self.amount.into(),
            _ => FieldValue::Empty,
        }
    }
}

impl FromExcelRow for LedgerEntry {
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()> {
        match field {
            "Posted" => self.posted = value.try_into()?,
            "Amount" => self.amount = value.try_into()?,
            _ => {}
        }
        Ok(())
    }
}
