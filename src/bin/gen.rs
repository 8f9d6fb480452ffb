//! Pseudo-random conformance-test program generator
//!
//! Emits eBPF programs in the text format the conformance tool consumes:
//! a disassembly section, the raw instruction words, and an expected
//! result. The programs are byte-random except for their opcode slots,
//! which are drawn from the set of valid opcodes so the tool exercises
//! its decoder rather than rejecting everything outright.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::Rng;
use rbpf::ebpf;

/// Generate pseudo-random conformance-test programs
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Minimum instruction count per program
    #[arg(long, default_value_t = 3)]
    min_size: u32,

    /// Maximum instruction count per program (exclusive)
    #[arg(long, default_value_t = 40)]
    max_size: u32,

    /// Number of programs to generate
    #[arg(long, default_value_t = 1)]
    count: u32,

    /// Output path pattern ("%d" expands to the program index); "-" writes to stdout
    #[arg(long, default_value = "-")]
    output: String,
}

/// Opcodes a generated instruction slot may carry
const VALID_OPCODES: &[u8] = &[
    // Loads
    ebpf::LD_ABS_B,
    ebpf::LD_ABS_H,
    ebpf::LD_ABS_W,
    ebpf::LD_ABS_DW,
    ebpf::LD_IND_B,
    ebpf::LD_IND_H,
    ebpf::LD_IND_W,
    ebpf::LD_IND_DW,
    ebpf::LD_DW_IMM,
    ebpf::LD_B_REG,
    ebpf::LD_H_REG,
    ebpf::LD_W_REG,
    ebpf::LD_DW_REG,
    // Stores
    ebpf::ST_B_IMM,
    ebpf::ST_H_IMM,
    ebpf::ST_W_IMM,
    ebpf::ST_DW_IMM,
    ebpf::ST_B_REG,
    ebpf::ST_H_REG,
    ebpf::ST_W_REG,
    ebpf::ST_DW_REG,
    ebpf::ST_W_XADD,
    ebpf::ST_DW_XADD,
    // 32-bit ALU
    ebpf::ADD32_IMM,
    ebpf::ADD32_REG,
    ebpf::SUB32_IMM,
    ebpf::SUB32_REG,
    ebpf::MUL32_IMM,
    ebpf::MUL32_REG,
    ebpf::DIV32_IMM,
    ebpf::DIV32_REG,
    ebpf::OR32_IMM,
    ebpf::OR32_REG,
    ebpf::AND32_IMM,
    ebpf::AND32_REG,
    ebpf::LSH32_IMM,
    ebpf::LSH32_REG,
    ebpf::RSH32_IMM,
    ebpf::RSH32_REG,
    ebpf::NEG32,
    ebpf::MOD32_IMM,
    ebpf::MOD32_REG,
    ebpf::XOR32_IMM,
    ebpf::XOR32_REG,
    ebpf::MOV32_IMM,
    ebpf::MOV32_REG,
    ebpf::ARSH32_IMM,
    ebpf::ARSH32_REG,
    ebpf::LE,
    ebpf::BE,
    // 64-bit ALU
    ebpf::ADD64_IMM,
    ebpf::ADD64_REG,
    ebpf::SUB64_IMM,
    ebpf::SUB64_REG,
    ebpf::MUL64_IMM,
    ebpf::MUL64_REG,
    ebpf::DIV64_IMM,
    ebpf::DIV64_REG,
    ebpf::OR64_IMM,
    ebpf::OR64_REG,
    ebpf::AND64_IMM,
    ebpf::AND64_REG,
    ebpf::LSH64_IMM,
    ebpf::LSH64_REG,
    ebpf::RSH64_IMM,
    ebpf::RSH64_REG,
    ebpf::NEG64,
    ebpf::MOD64_IMM,
    ebpf::MOD64_REG,
    ebpf::XOR64_IMM,
    ebpf::XOR64_REG,
    ebpf::MOV64_IMM,
    ebpf::MOV64_REG,
    ebpf::ARSH64_IMM,
    ebpf::ARSH64_REG,
    // Jumps
    ebpf::JA,
    ebpf::JEQ_IMM,
    ebpf::JEQ_REG,
    ebpf::JGT_IMM,
    ebpf::JGT_REG,
    ebpf::JGE_IMM,
    ebpf::JGE_REG,
    ebpf::JLT_IMM,
    ebpf::JLT_REG,
    ebpf::JLE_IMM,
    ebpf::JLE_REG,
    ebpf::JSET_IMM,
    ebpf::JSET_REG,
    ebpf::JNE_IMM,
    ebpf::JNE_REG,
    ebpf::JSGT_IMM,
    ebpf::JSGT_REG,
    ebpf::JSGE_IMM,
    ebpf::JSGE_REG,
    ebpf::JSLT_IMM,
    ebpf::JSLT_REG,
    ebpf::JSLE_IMM,
    ebpf::JSLE_REG,
    ebpf::CALL,
    ebpf::TAIL_CALL,
    ebpf::EXIT,
    // 32-bit jumps
    ebpf::JEQ_IMM32,
    ebpf::JEQ_REG32,
    ebpf::JGT_IMM32,
    ebpf::JGT_REG32,
    ebpf::JGE_IMM32,
    ebpf::JGE_REG32,
    ebpf::JLT_IMM32,
    ebpf::JLT_REG32,
    ebpf::JLE_IMM32,
    ebpf::JLE_REG32,
    ebpf::JSET_IMM32,
    ebpf::JSET_REG32,
    ebpf::JNE_IMM32,
    ebpf::JNE_REG32,
    ebpf::JSGT_IMM32,
    ebpf::JSGT_REG32,
    ebpf::JSGE_IMM32,
    ebpf::JSGE_REG32,
    ebpf::JSLT_IMM32,
    ebpf::JSLT_REG32,
    ebpf::JSLE_IMM32,
    ebpf::JSLE_REG32,
];

/// Generate `count` instructions of random bytes with valid opcode slots
fn generate_instructions(count: u32, rng: &mut impl Rng) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..count * 8).map(|_| rng.random()).collect();

    let mut pc = 0;
    while pc < bytes.len() {
        bytes[pc] = VALID_OPCODES[rng.random_range(0..VALID_OPCODES.len())];
        pc += 8;
    }

    // A trailing lddw would swallow the slot after it; end on exit instead.
    let last = bytes.len() - 8;
    if bytes[last] == ebpf::LD_DW_IMM {
        bytes[last] = ebpf::EXIT;
    }

    bytes
}

/// Render instruction bytes in the conformance tool's test-file format
fn render_program(bytes: &[u8]) -> String {
    let mut output = String::new();

    output.push_str("-- asm\n");
    for insn in rbpf::disassembler::to_insn_vec(bytes) {
        output.push_str(&insn.desc);
        output.push('\n');
    }

    // The tool's raw section wants one 64-bit little-endian word per line.
    output.push_str("-- raw\n");
    for chunk in bytes.chunks_exact(8) {
        let word = u64::from_le_bytes(chunk.try_into().unwrap());
        output.push_str(&format!("0x{:016x}\n", word));
    }

    output.push_str("-- result\n");
    output.push_str("0x0\n");

    output
}

fn write_program(pattern: &str, index: u32, program: &str) -> Result<()> {
    let output_path = pattern.replace("%d", &index.to_string());
    if let Some(parent) = Path::new(&output_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    std::fs::write(&output_path, program)
        .with_context(|| format!("Failed to write '{}'", output_path))
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.min_size >= args.max_size {
        bail!("--min-size must be below --max-size");
    }

    let mut rng = rand::rng();

    for index in 0..args.count {
        let size = rng.random_range(args.min_size..args.max_size);
        let program = render_program(&generate_instructions(size, &mut rng));

        if args.output == "-" {
            print!("{}", program);
        } else {
            write_program(&args.output, index, &program)?;
        }
    }

    Ok(())
}
