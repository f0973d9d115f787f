//! Disassembler

use clap::Args;
use ember_evm::Program;
use serde_json::json;

use crate::{output::Output, CliError};

/// Arguments for `ember disasm`
#[derive(Debug, Args)]
pub struct DisasmCommand {
    /// Bytecode hex (0x prefix optional)
    pub code: String,
}

impl DisasmCommand {
    pub fn execute(self, json: bool) -> Result<(), CliError> {
        let program =
            Program::from_hex(&self.code).map_err(|e| CliError::InvalidHex(e.to_string()))?;
        render(&program, json).print();
        Ok(())
    }
}

fn render(program: &Program, json: bool) -> Output {
    let mut output = Output::new(json)
        .field_u64("size", program.size() as u64)
        .field_value(
            "instructions",
            program
                .iter()
                .map(|(offset, ins)| {
                    json!({
                        "offset": offset,
                        "opcode": format!("0x{:02x}", ins.byte),
                        "text": ins.to_string(),
                    })
                })
                .collect(),
        );
    for (offset, ins) in program.iter() {
        output = output.line(format!("{:04x}: {}", offset, ins));
    }
    output
}
