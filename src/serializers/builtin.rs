// ABOUTME: Built-in serializers for the file-processing database configuration tables
// ABOUTME: Listed in dependency order so parents are imported before the tables referencing them

use super::{TableGroup, TableSerializer};
use crate::utils::quote_ident;

struct BuiltinTable {
    table: &'static str,
    group: TableGroup,
    columns: &'static [&'static str],
    /// Unique ordering key; batched tables page over it
    order_by: &'static [&'static str],
    batched: bool,
}

const BUILTIN_TABLES: &[BuiltinTable] = &[
    BuiltinTable {
        table: "DBInfo",
        group: TableGroup::Core,
        columns: &["Name", "Value"],
        order_by: &["Name"],
        batched: false,
    },
    BuiltinTable {
        table: "Workflow",
        group: TableGroup::Core,
        columns: &[
            "Name",
            "WorkflowTypeCode",
            "Description",
            "LoadBalanceWeight",
            "EditActionName",
            "EndActionName",
        ],
        order_by: &["Name"],
        batched: false,
    },
    BuiltinTable {
        table: "Action",
        group: TableGroup::Core,
        columns: &["ASCName", "Description", "WorkflowName", "MainSequence"],
        order_by: &["ASCName", "WorkflowName"],
        batched: false,
    },
    BuiltinTable {
        table: "Tag",
        group: TableGroup::Core,
        columns: &["TagName", "TagDescription"],
        order_by: &["TagName"],
        batched: false,
    },
    BuiltinTable {
        table: "FileHandler",
        group: TableGroup::Core,
        columns: &[
            "AppName",
            "Enabled",
            "IconPath",
            "ApplicationPath",
            "Arguments",
            "AdminOnly",
            "AllowMultipleFiles",
            "SupportsErrorHandling",
            "Blocking",
            "WorkflowName",
        ],
        order_by: &["AppName"],
        batched: false,
    },
    BuiltinTable {
        table: "FAMUser",
        group: TableGroup::Users,
        columns: &["UserName", "FullUserName"],
        order_by: &["UserName"],
        batched: true,
    },
    BuiltinTable {
        table: "Login",
        group: TableGroup::Users,
        columns: &["UserName", "Password"],
        order_by: &["UserName"],
        batched: false,
    },
    BuiltinTable {
        table: "AttributeSetName",
        group: TableGroup::Attributes,
        columns: &["Description"],
        order_by: &["Description"],
        batched: false,
    },
    BuiltinTable {
        table: "MetadataField",
        group: TableGroup::Attributes,
        columns: &["Name"],
        order_by: &["Name"],
        batched: false,
    },
    BuiltinTable {
        table: "MLModel",
        group: TableGroup::Attributes,
        columns: &["Name"],
        order_by: &["Name"],
        batched: false,
    },
    BuiltinTable {
        table: "Dashboard",
        group: TableGroup::Dashboards,
        columns: &[
            "DashboardName",
            "Definition",
            "UserName",
            "LastImportedDate",
            "UseExtractedData",
            "ExtractedDataDefinition",
        ],
        order_by: &["DashboardName"],
        batched: false,
    },
    BuiltinTable {
        table: "DatabaseService",
        group: TableGroup::Dashboards,
        columns: &["Description", "Settings", "Enabled"],
        order_by: &["Description"],
        batched: false,
    },
    BuiltinTable {
        table: "LabDEPatient",
        group: TableGroup::LabDe,
        columns: &[
            "MRN",
            "FirstName",
            "MiddleName",
            "LastName",
            "Suffix",
            "DOB",
            "Gender",
            "MergedInto",
            "CurrentMRN",
        ],
        order_by: &["MRN"],
        batched: true,
    },
    BuiltinTable {
        table: "LabDEProvider",
        group: TableGroup::LabDe,
        columns: &[
            "ID",
            "FirstName",
            "MiddleName",
            "LastName",
            "ProviderType",
            "Title",
            "Degree",
            "Departments",
            "Specialties",
            "Phone",
            "Fax",
            "Address",
            "OtherProviderID",
            "Inactive",
            "MFNMessage",
        ],
        order_by: &["ID"],
        batched: true,
    },
    BuiltinTable {
        table: "LabDEEncounter",
        group: TableGroup::LabDe,
        columns: &[
            "CSN",
            "PatientMRN",
            "EncounterDateTime",
            "Department",
            "EncounterType",
            "EncounterProvider",
            "DischargeDate",
            "AdmissionDate",
            "ADTMessage",
        ],
        order_by: &["CSN"],
        batched: true,
    },
    BuiltinTable {
        table: "LabDEOrder",
        group: TableGroup::LabDe,
        columns: &[
            "OrderNumber",
            "OrderCode",
            "PatientMRN",
            "ReceivedDateTime",
            "OrderStatus",
            "ReferenceDateTime",
            "ORMMessage",
            "EncounterID",
            "AccessionNumber",
        ],
        order_by: &["OrderNumber"],
        batched: true,
    },
    BuiltinTable {
        table: "WebAppConfig",
        group: TableGroup::Web,
        columns: &["Type", "WorkflowName", "Settings"],
        order_by: &["Type", "WorkflowName"],
        batched: false,
    },
    BuiltinTable {
        table: "UserCreatedCounter",
        group: TableGroup::Web,
        columns: &["CounterName", "Value"],
        order_by: &["CounterName"],
        batched: false,
    },
    BuiltinTable {
        table: "DataEntryCounterDefinition",
        group: TableGroup::Web,
        columns: &["Name", "AttributeQuery", "RecordOnLoad", "RecordOnSave"],
        order_by: &["Name"],
        batched: false,
    },
];

fn quoted_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

impl BuiltinTable {
    fn to_serializer(&self) -> TableSerializer {
        let select_sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            quoted_list(self.columns),
            quote_ident(self.table),
            quoted_list(self.order_by)
        );

        if self.batched {
            let row_count_sql = format!("SELECT COUNT(*) FROM {}", quote_ident(self.table));
            TableSerializer::batched(self.table, self.group, self.table, select_sql, row_count_sql)
        } else {
            TableSerializer::bulk(self.table, self.group, self.table, select_sql)
        }
    }
}

/// All built-in serializers, in dependency order
pub fn builtin_serializers() -> Vec<TableSerializer> {
    BUILTIN_TABLES.iter().map(BuiltinTable::to_serializer).collect()
}
