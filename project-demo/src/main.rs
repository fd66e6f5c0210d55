//! Ponto de entrada da aplicação demo do projeto.
//!
//! Toda a implementação interessante foi feita nos módulos da crate `vm` --
//! em especial a busca de frames em `vm::frame_search`. Este arquivo apenas
//! instancia a Mmu e faz o handling da entrada padrão.
//!
//! ## Entrada
//!
//! Este programa espera uma entrada linha-a-linha, onde cada linha é um
//! comando dos seguintes:
//!
//! - `r <address>`: lê a palavra no endereço `<address>` e apresenta na
//!   stdout;
//! - `w <address> <word>`: escreve `<word>` em `<address>`;
//!
//! Note que todos os valores *são em hexadecimal*. Uma linha vazia encerra a
//! sessão e apresenta as estatísticas acumuladas.
//!
//! ### Exemplo
//!
//! ```text
//! w 0xCAFE 0xA
//! r 0xCAFE
//! r 0xBABE
//! ```
//!
//! Com `--swapfile <arquivo>` as páginas evictadas são persistidas no
//! arquivo dado (veja `file_page_store`); sem a flag, ficam num store em
//! memória que morre com o processo.

mod file_page_store;

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use file_page_store::SwapFilePageStore;
use vm::mmu::Mmu;
use vm::page_store::{InMemoryPageStore, PageStore};
use vm::Word;

// Geometria da demo: frames de 16 palavras, 64 frames físicos e 4096 páginas
// virtuais em 3 níveis de tabela.
const OFFSET_WIDTH: usize = 4;
const PHYSICAL_ADDRESS_WIDTH: usize = 10;
const VIRTUAL_ADDRESS_WIDTH: usize = 16;

const PAGE_SIZE: usize = 1 << OFFSET_WIDTH;
const NUM_PAGES: usize = 1 << (VIRTUAL_ADDRESS_WIDTH - OFFSET_WIDTH);

type DemoMmu<S> = Mmu<OFFSET_WIDTH, PHYSICAL_ADDRESS_WIDTH, VIRTUAL_ADDRESS_WIDTH, S>;

#[derive(Parser)]
#[command(name = "project-demo")]
#[command(about = "REPL de leitura/escrita sobre a memória virtual simulada")]
struct Cli {
    /// Arquivo swap para persistir as páginas evictadas entre execuções.
    #[arg(long)]
    swapfile: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.swapfile {
        Some(path) => {
            log::info!("demo: páginas evictadas vão para {}", path.display());
            let store = SwapFilePageStore::<NUM_PAGES, PAGE_SIZE>::open(&path)
                .with_context(|| format!("abrindo o arquivo swap {}", path.display()))?;
            run(DemoMmu::new(store))
        }
        None => run(DemoMmu::new(InMemoryPageStore::new())),
    }
}

fn run<S: PageStore>(mut mmu: DemoMmu<S>) -> anyhow::Result<()> {
    mmu.initialize();

    let mut stdin = std::io::stdin().lock();
    let mut line = String::new();

    loop {
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("r") => {
                let address = parse_hex(tokens.next())?;
                match mmu.read(address) {
                    Ok(value) => println!("{:#06X} => {:#X}", address, value),
                    Err(e) => println!("erro: {}", e),
                }
            }
            Some("w") => {
                let address = parse_hex(tokens.next())?;
                let value = parse_word(tokens.next())?;
                if let Err(e) = mmu.write(address, value) {
                    println!("erro: {}", e);
                }
            }
            None => break,
            Some(cmd) => println!("comando inválido: {}", cmd),
        }
    }

    mmu.stats.print_stats();

    Ok(())
}

fn parse_hex(token: Option<&str>) -> anyhow::Result<usize> {
    let token = token.context("faltou um argumento hexadecimal")?;
    let digits = token.strip_prefix("0x").unwrap_or(token);
    usize::from_str_radix(digits, 16).with_context(|| format!("valor hexadecimal inválido: {}", token))
}

fn parse_word(token: Option<&str>) -> anyhow::Result<Word> {
    let token = token.context("faltou um argumento hexadecimal")?;
    let digits = token.strip_prefix("0x").unwrap_or(token);
    Word::from_str_radix(digits, 16).with_context(|| format!("valor hexadecimal inválido: {}", token))
}
