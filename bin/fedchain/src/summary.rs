use comfy_table::{Table, presets::UTF8_FULL};
use fedchain_deploy::MigrationReport;

/// Render the deployed contracts as a table.
pub fn render(report: &MigrationReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Contract",
        "Address",
        "Transaction",
        "Block",
        "Gas used",
    ]);

    for contract in &report.contracts {
        table.add_row(vec![
            contract.contract_name.clone(),
            contract.address.to_checksum(None),
            contract.transaction_hash.to_string(),
            optional(contract.block_number),
            optional(contract.gas_used),
        ]);
    }

    format!(
        "chain {} ({})\n{}",
        report.chain_id, report.status, table
    )
}

fn optional(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
