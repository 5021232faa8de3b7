// ==========================================
// 销售分析看板 - 标准字段目录
// ==========================================
// 职责: sales_data 表的全部目标列（编译期常量）
//       + 每个字段的源表头别名（按优先级）
//       + 字段类型（文本 / 数值 / 日期）
// 红线: 目录与持久化 schema 一一对应，不可运行时修改
// ==========================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 字段类型，决定类型转换规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

macro_rules! canonical_fields {
    ($( $variant:ident => $name:literal, $kind:ident, [$($alias:literal),* $(,)?] );* $(;)?) => {
        /// 标准字段（目标列名）
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum CanonicalField {
            $($variant),*
        }

        impl CanonicalField {
            /// 全部标准字段，顺序与表结构一致
            pub const ALL: &'static [CanonicalField] = &[$(CanonicalField::$variant),*];

            /// 目标列名
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(CanonicalField::$variant => $name),*
                }
            }

            pub fn kind(&self) -> FieldKind {
                match self {
                    $(CanonicalField::$variant => FieldKind::$kind),*
                }
            }

            /// 源文件表头别名，按优先级排列（先出现者优先）
            pub fn header_aliases(&self) -> &'static [&'static str] {
                match self {
                    $(CanonicalField::$variant => &[$($alias),*]),*
                }
            }
        }
    };
}

canonical_fields! {
    SalesType => "sales_type", Text, ["Sales Type"];
    Invoice => "invoice", Text, ["Invoice"];
    Voucher => "voucher", Text, ["Voucher"];
    InvoiceDate => "invoice_date", Date, ["Invoice date", "Date", "Invoice Date"];
    Pool => "pool", Text, ["Pool"];
    SupplyMethod => "supply_method", Text, ["Supply method"];
    SubMethod1 => "sub_method_1", Text, ["Sub Method - 1"];
    SubMethod2 => "sub_method_2", Text, ["Sub Method - 2"];
    SubMethod3 => "sub_method_3", Text, ["Sub Method - 3"];
    Application => "application", Text, ["Application"];
    Industry => "industry", Text, ["Industry"];
    SubIndustry1 => "sub_industry_1", Text, ["Sub Industry - 1"];
    SubIndustry2 => "sub_industry_2", Text, ["Sub Industry - 2"];
    GeneralGroup => "general_group", Text, ["General group"];
    SalesOrder => "sales_order", Text, ["Sales order"];
    AccountNumber => "account_number", Text, ["Account number"];
    Name => "name", Text, ["Name"];
    Name2 => "name2", Text, ["Name2"];
    CustomerInvoiceAccount => "customer_invoice_account", Text, ["Customer invoice account"];
    InvoiceAccount => "invoice_account", Text, ["Invoice account"];
    Group => "group", Text, ["Group"];
    Currency => "currency", Text, ["Currency"];
    InvoiceAmount => "invoice_amount", Number, ["Invoice Amount"];
    InvoiceAmountMst => "invoice_amount_mst", Number, ["Invoice Amount_MST"];
    SalesTaxAmount => "sales_tax_amount", Number, ["Sales tax amount"];
    SalesTaxAmountAccounting => "sales_tax_amount_accounting", Number,
        ["The sales tax amount, in the accounting currency"];
    TotalForInvoice => "total_for_invoice", Number, ["Total for invoice"];
    TotalMst => "total_mst", Number, ["Total_MST"];
    OpenBalance => "open_balance", Number, ["Open balance"];
    DueDate => "due_date", Date, ["Due date"];
    SalesTaxGroup => "sales_tax_group", Text, ["Sales tax group"];
    PaymentType => "payment_type", Text, ["Payment type"];
    TermsOfPayment => "terms_of_payment", Text, ["Terms of payment"];
    PaymentSchedule => "payment_schedule", Text, ["Payment schedule"];
    MethodOfPayment => "method_of_payment", Text, ["Method of payment"];
    PostingProfile => "posting_profile", Text, ["Posting profile"];
    DeliveryTerms => "delivery_terms", Text, ["Delivery terms"];
    HDimWk => "h_dim_wk", Text, ["H_DIM_WK"];
    HWkName => "h_wk_name", Text, ["H_WK_NAME"];
    HDimCc => "h_dim_cc", Text, ["H_DIM_CC"];
    HDimName => "h_dim_name", Text, ["H DIM NAME"];
    LineNumber => "line_number", Text, ["Line number"];
    Street => "street", Text, ["Street"];
    City => "city", Text, ["City"];
    State => "state", Text, ["State"];
    ZipPostalCode => "zip_postal_code", Text, ["ZIP/postal code"];
    FinalZipcode => "final_zipcode", Text, ["Final ZipCode"];
    Region => "region", Text, ["Region"];
    ProductType => "product_type", Text, ["Product type"];
    ItemGroup => "item_group", Text, ["Item group"];
    Category => "category", Text, ["Category"];
    Model => "model", Text, ["Model"];
    ItemNumber => "item_number", Text, ["Item number", "Item Number"];
    ProductName => "product_name", Text, ["Product name", "Product"];
    Text => "text", Text, ["Text"];
    Warehouse => "warehouse", Text, ["Warehouse"];
    Name3 => "name3", Text, ["Name3"];
    Quantity => "quantity", Number, ["Quantity"];
    InventoryUnit => "inventory_unit", Text, ["Inventory unit"];
    PriceUnit => "price_unit", Number, ["Price unit"];
    NetAmount => "net_amount", Number, ["Net amount"];
    LineAmountMst => "line_amount_mst", Number, ["Line Amount_MST", "Line Amount MST", "Sales Amount"];
    SalesTaxGroup2 => "sales_tax_group2", Text, ["Sales tax group2"];
    TaxItemGroup => "tax_item_group", Text, ["TaxItemGroup"];
    ModeOfDelivery => "mode_of_delivery", Text, ["Mode of delivery"];
    DlvDetail => "dlv_detail", Text, ["Dlv Detail"];
    OnlineOrder => "online_order", Text, ["Online order"];
    SalesChannel => "sales_channel", Text, ["Sales channel", "Sales Channel"];
    Promotion => "promotion", Text, ["Promotion"];
    SecondSales => "second_sales", Text, ["2nd Sales"];
    PersonnelNumber => "personnel_number", Text, ["Personnel number"];
    WorkerName => "worker_name", Text, ["WORKERNAME"];
    LDimName => "l_dim_name", Text, ["L DIM NAME"];
    LDimWk => "l_dim_wk", Text, ["L_DIM_WK"];
    LWkName => "l_wk_name", Text, ["L_WK_NAME"];
    LDimCc => "l_dim_cc", Text, ["L_DIM_CC"];
    MainAccount => "main_account", Text, ["Main account"];
    AccountName => "account_name", Text, ["Account name"];
    Rebate => "rebate", Number, ["Rebate"];
    Description => "description", Text, ["Description"];
    Country => "country", Text, ["Country"];
    CreatedDate => "created_date", Date, ["CREATEDDATE"];
    CreatedBy => "created_by", Text, ["CREATEDBY"];
    Exception => "exception", Text, ["Exception"];
    WithCollectionAgency => "with_collection_agency", Text, ["With collection agency"];
    CreditRating => "credit_rating", Text, ["Credit rating"];
}

/// 格式识别锚点表头：首行至少出现其一才认为是销售导出文件
pub const ANCHOR_HEADERS: [&str; 4] = ["Invoice date", "Date", "Invoice", "Invoice Amount"];

impl CanonicalField {
    /// 全部目标列名（列检测接口原样返回给前端）
    pub fn catalog() -> Vec<&'static str> {
        CanonicalField::ALL.iter().map(|f| f.as_str()).collect()
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 未知的目标列名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown destination column: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for CanonicalField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

// 序列化为目标列名，与 sales_data 列保持一致
impl Serialize for CanonicalField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CanonicalField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
