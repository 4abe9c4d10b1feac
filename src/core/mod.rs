pub mod assessment;
pub mod audit;
pub mod base;
pub mod brackets;
pub mod compliance;
pub mod error;
pub mod excise;
pub mod gst;
pub mod income;
pub mod money;
pub mod payroll;
pub mod penalty;
pub mod rates;
pub mod repository;
pub mod tax_type;
pub mod tax_year;

// Flat public surface for domain types and functions.
pub use assessment::{
    compute, AssessmentBatch, AssessmentOrchestrator, AssessmentRequest, CalculationRequest,
    ComprehensiveAssessment, TaxCalculation, TaxComputation, TaxFiling, TaxOutcome,
};
pub use audit::{describe_component, penalty_lines};
pub use base::{
    Allowance, EmployeeSalary, ExciseBase, ExciseItem, GstBase, IncomeBase, PayrollBase,
    TaxableBase,
};
pub use brackets::{evaluate, BracketSlice, CalculationResult};
pub use compliance::{
    score_compliance, ComplianceIssue, ComplianceReport, CompletenessSignals, Grade, GradeBand,
    IssueType, ScoreComponents, ScoringPolicy, Severity, TaxTypeSignal, GRADE_BANDS,
};
pub use error::EngineError;
pub use excise::{calculate_excise, ExciseLine, ExciseResult};
pub use gst::{calculate_gst, GstResult};
pub use income::{calculate_income_tax, IncomeTaxResult};
pub use money::{format_amount, format_rate, round_money, round_rate};
pub use payroll::{calculate_payroll_tax, EmployeePaye, PayrollResult};
pub use penalty::{
    calculate_penalty, InterestMethod, PenaltyComponent, PenaltyInput, PenaltyKind, PenaltyResult,
    PenaltyTerms,
};
pub use rates::{Bracket, DutyBasis, ExciseRate, RateParameters, RateTable, DAYS_PER_MONTH};
pub use repository::{resolve, RateQuery, RateRepository, RateSnapshot};
pub use tax_type::{TaxType, TaxpayerCategory};
pub use tax_year::TaxYear;
