//! Field Schema Registry
//! 部品タイプごとの入力フィールド定義（顧客要求フォーム + 技術見積フォーム）
//!
//! ラベルはそのまま保存キーとして使われる。ラベルを変更すると既存データが
//! 旧ラベルの下に取り残されるため、定義済みラベルは安定文字列として扱うこと。

use serde::{Deserialize, Serialize};

/// 入力種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    TextArea,
}

/// フィールド定義（表示順 = 定義順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn text(label: &'static str) -> FieldDefinition {
    FieldDefinition { label, kind: FieldKind::Text }
}

const fn number(label: &'static str) -> FieldDefinition {
    FieldDefinition { label, kind: FieldKind::Number }
}

const fn textarea(label: &'static str) -> FieldDefinition {
    FieldDefinition { label, kind: FieldKind::TextArea }
}

/// 取り扱い部品タイプ（5種、固定）
pub const PART_TYPES: [&str; 5] = [
    "Backstop Quotation",
    "Brake Quotation",
    "Coupling and Torque Limiter Quotation",
    "Locking Element for Conveyor Quotation",
    "Over Running Clutch Quotation",
];

// ========================================
// 顧客要求フィールド
// ========================================

const BRAKE_REQUIREMENT_FIELDS: &[FieldDefinition] = &[
    text("SL No."),
    text("Tag Number"),
    text("Application"),
    number("Motor KW"),
    number("Number of Drive"),
    number("Stopping Torque (Mn) Min (Nm)"),
    number("Stopping Torque (Mn) Max (Nm)"),
    number("Speed at Brake Min (RPM)"),
    number("Speed at Brake Rated (RPM)"),
    number("Speed at Brake Max (RPM)"),
    number("Stopping Time"),
    number("Number of Braking Per Second"),
    number("Number of Braking Per Hour"),
    number("Number of Braking Per Day"),
    number("Friction coefficient between brake and brake disc"),
    number("Service Factor"),
];

const BACKSTOP_REQUIREMENT_FIELDS: &[FieldDefinition] = &[
    text("SL No."),
    text("Tag Number"),
    text("Application"),
    number("Shaft Diameter (mm)"),
    number("Torque (Mn) Min (Nm)"),
    number("Torque (Mn) Max (Nm)"),
    number("Speed Min (RPM)"),
    number("Speed Rated (RPM)"),
    number("Speed Max (RPM)"),
    number("Operating Hours (daily)"),
    number("Service Factor"),
];

const COUPLING_REQUIREMENT_FIELDS: &[FieldDefinition] = &[
    text("SL No."),
    text("Tag Number"),
    text("Application"),
    number("Motor KW"),
    number("Number of Drive"),
    number("Torque (Mn) Min (Nm)"),
    number("Torque (Mn) Max (Nm)"),
    number("Speed at Coupling Min (RPM)"),
    number("Speed at Coupling Rated (RPM)"),
    number("Speed at Coupling Max (RPM)"),
    number("Service Factor"),
];

const LOCKING_REQUIREMENT_FIELDS: &[FieldDefinition] = &[
    text("SL No."),
    text("Pulley type"),
    text("Tag number"),
    text("Application"),
    number("Pulley Qty"),
    number("Hub material Yield strength (Re) N/mm2"),
    number("Shaft diameter (d) mm"),
    number("Outer diameter of pulley (D2) mm"),
    number("Tension tight side Running condition (T1) KN"),
    number("Tension slack side Running condition (T2) KN"),
    number("Tension tight side Starting condition (T1) KN"),
    number("Tension slack side Starting condition (T2) KN"),
    number("Arm length (L) mm"),
    number("Wrap angel (β) deg"),
    number("start-up factor Running condition"),
    number("start-up factor starting condition"),
    number("Torque Running condition (M) Nm"),
    number("Bending moment Running condition (Mb) Nm"),
    number("Torque Starting condition (M) Nm"),
    number("Bending moment Starting condition (Mb) Nm"),
];

const CLUTCH_REQUIREMENT_FIELDS: &[FieldDefinition] = &[
    text("SL No."),
    text("Tag number"),
    text("Application"),
    number("Shaft diameter Main drive - Drive (mm)"),
    number("Shaft diameter Main drive - Driven (mm)"),
    number("Shaft diameter Auxiliary drive - Drive (mm)"),
    number("Shaft diameter Auxiliary drive - Driven (mm)"),
    number("Torque  Main drive - Min (Nm)"),
    number("Torque Main drive - Max (Nm)"),
    number("Torque Auxiliary drive - Min (Nm)"),
    number("Torque Auxiliary drive - Max (Nm)"),
    number("Speed Main drive - Min (RPM)"),
    number("Speed Main drive - Rated (RPM)"),
    number("Speed Main drive - Max (RPM)"),
    number("Speed Auxiliary drive - Min (RPM)"),
    number("Speed Auxiliary drive - Rated (RPM)"),
    number("Speed Auxiliary drive - Max (RPM)"),
    number("Operating hours - daily"),
    text("Direction of rotation from drive side - Main drive"),
    text("Direction of rotation from drive side - Auxiliary drive"),
];

// ========================================
// 技術見積フィールド
// ========================================

const BRAKE_TECHNICAL_FIELDS: &[FieldDefinition] = &[
    number("Product Quantity"),
    text("Model"),
    number("Size"),
    text("Type"),
    number("Thruster/Cylinder size"),
    text("Material"),
    textarea("Accessories"),
    number("Drum/Disc size"),
    number("Brake Torque (Nm)"),
    number("Theoretical Stopping time for selected brake (sec)"),
    textarea("Technical Points"),
];

const BACKSTOP_TECHNICAL_FIELDS: &[FieldDefinition] = &[
    number("Product Quantity"),
    text("Product Code"),
    number("Size"),
    text("Type"),
    textarea("Technical Points"),
];

const COUPLING_TECHNICAL_FIELDS: &[FieldDefinition] = &[
    number("Product Quantity"),
    text("Model"),
    textarea("Special Requirements"),
    textarea("Technical Points"),
];

const LOCKING_TECHNICAL_FIELDS: &[FieldDefinition] = &[
    number("Locking element Qty"),
    text("Product code"),
    text("Size"),
    number("Hub inner diameter (Di) mm"),
    number("Hub outer diameter (Knin) mm"),
    number("Hub length (Knin) mm"),
    number("Torque (Mact) Nm"),
    number("Bending moment (Mb) Nm"),
    number("Screw Tightening torque (Ms) Nm"),
    number("Shaft pressure (Pw) N/mm2"),
    textarea("Technical points"),
];

const CLUTCH_TECHNICAL_FIELDS: &[FieldDefinition] = &[
    text("Product code"),
    text("Size"),
    textarea("Technical points"),
];

// ========================================
// Registry
// ========================================

/// 顧客要求フィールド定義を返す（未知の部品タイプは空）
pub fn requirement_fields(part_type: &str) -> &'static [FieldDefinition] {
    match part_type {
        "Brake Quotation" => BRAKE_REQUIREMENT_FIELDS,
        "Backstop Quotation" => BACKSTOP_REQUIREMENT_FIELDS,
        "Coupling and Torque Limiter Quotation" => COUPLING_REQUIREMENT_FIELDS,
        "Locking Element for Conveyor Quotation" => LOCKING_REQUIREMENT_FIELDS,
        "Over Running Clutch Quotation" => CLUTCH_REQUIREMENT_FIELDS,
        _ => &[],
    }
}

/// 技術見積フィールド定義を返す（未知の部品タイプは空）
pub fn technical_fields(part_type: &str) -> &'static [FieldDefinition] {
    match part_type {
        "Brake Quotation" => BRAKE_TECHNICAL_FIELDS,
        "Backstop Quotation" => BACKSTOP_TECHNICAL_FIELDS,
        "Coupling and Torque Limiter Quotation" => COUPLING_TECHNICAL_FIELDS,
        "Locking Element for Conveyor Quotation" => LOCKING_TECHNICAL_FIELDS,
        "Over Running Clutch Quotation" => CLUTCH_TECHNICAL_FIELDS,
        _ => &[],
    }
}
