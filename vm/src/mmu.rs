//! A unidade de tradução: caminha pela árvore de tabelas materializando os
//! níveis que faltam até chegar no frame da página pedida.

use log::{debug, trace};

use crate::addr::split_offsets;
use crate::frame_search::{self, FrameChoice};
use crate::geometry;
use crate::page_store::PageStore;
use crate::stats::MmuStats;
use crate::Word;

/// Falha de acesso reportada por [`Mmu::read`] e [`Mmu::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// O endereço virtual não cabe no espaço de endereçamento.
    AddressOutOfRange { virtual_address: usize },
}

impl std::fmt::Display for AccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessError::AddressOutOfRange { virtual_address } => {
                write!(
                    f,
                    "endereço virtual {:#X} fora do espaço de endereçamento",
                    virtual_address
                )
            }
        }
    }
}

impl std::error::Error for AccessError {}

/// Memória virtual demand-paged sobre uma memória física de
/// `NUM_FRAMES * PAGE_SIZE` palavras.
///
/// O frame 0 é reservado para a tabela raiz. Os demais frames alternam entre
/// tabela interna, página de dados e memória sem uso, conforme a busca em
/// [`frame_search`] os instala e recicla. As páginas evictadas vivem no
/// [`PageStore`].
pub struct Mmu<
    const OFFSET_WIDTH: usize,
    const PHYSICAL_ADDRESS_WIDTH: usize,
    const VIRTUAL_ADDRESS_WIDTH: usize,
    S: PageStore,
> {
    memory: Vec<Word>,
    store: S,
    pub stats: MmuStats,
}

impl<
        const OFFSET_WIDTH: usize,
        const PHYSICAL_ADDRESS_WIDTH: usize,
        const VIRTUAL_ADDRESS_WIDTH: usize,
        S: PageStore,
    > Mmu<OFFSET_WIDTH, PHYSICAL_ADDRESS_WIDTH, VIRTUAL_ADDRESS_WIDTH, S>
{
    pub const PAGE_SIZE: usize = geometry::page_size(OFFSET_WIDTH);
    pub const NUM_FRAMES: usize = geometry::num_frames(PHYSICAL_ADDRESS_WIDTH, OFFSET_WIDTH);
    pub const VIRTUAL_MEMORY_SIZE: usize = geometry::virtual_memory_size(VIRTUAL_ADDRESS_WIDTH);
    pub const NUM_PAGES: usize = geometry::num_pages(VIRTUAL_ADDRESS_WIDTH, OFFSET_WIDTH);
    pub const TABLES_DEPTH: usize = geometry::tables_depth(VIRTUAL_ADDRESS_WIDTH, OFFSET_WIDTH);

    /// Cria a Mmu com a memória física inteira zerada.
    pub fn new(store: S) -> Self {
        assert!(OFFSET_WIDTH >= 1);
        assert!(PHYSICAL_ADDRESS_WIDTH > OFFSET_WIDTH);
        assert!(VIRTUAL_ADDRESS_WIDTH > OFFSET_WIDTH);
        // Raiz mais ao menos um frame utilizável.
        assert!(Self::NUM_FRAMES >= 2);

        Mmu {
            memory: vec![0; Self::NUM_FRAMES * Self::PAGE_SIZE],
            store,
            stats: MmuStats::default(),
        }
    }

    /// Zera a tabela raiz (frame 0). Slot zerado significa "não mapeado",
    /// então nenhum outro frame precisa ser tocado.
    pub fn initialize(&mut self) {
        self.memory[..Self::PAGE_SIZE].fill(0);
    }

    /// Lê a palavra no endereço virtual dado.
    pub fn read(&mut self, virtual_address: usize) -> Result<Word, AccessError> {
        self.check_bounds(virtual_address)?;

        let leaf = self.translate(virtual_address);
        let offset = virtual_address & (Self::PAGE_SIZE - 1);

        self.stats.reads += 1;
        Ok(self.memory[leaf * Self::PAGE_SIZE + offset])
    }

    /// Escreve a palavra no endereço virtual dado.
    pub fn write(&mut self, virtual_address: usize, value: Word) -> Result<(), AccessError> {
        self.check_bounds(virtual_address)?;

        let leaf = self.translate(virtual_address);
        let offset = virtual_address & (Self::PAGE_SIZE - 1);

        self.stats.writes += 1;
        self.memory[leaf * Self::PAGE_SIZE + offset] = value;
        Ok(())
    }

    /// A memória física inteira, para inspeção.
    pub fn physical_memory(&self) -> &[Word] {
        &self.memory
    }

    fn check_bounds(&self, virtual_address: usize) -> Result<(), AccessError> {
        if virtual_address >= Self::VIRTUAL_MEMORY_SIZE
            || (virtual_address >> OFFSET_WIDTH) >= Self::NUM_PAGES
        {
            return Err(AccessError::AddressOutOfRange { virtual_address });
        }

        Ok(())
    }

    /// Caminha da raiz até a folha e devolve o frame que contém a página.
    fn translate(&mut self, virtual_address: usize) -> usize {
        let page_number = virtual_address >> OFFSET_WIDTH;
        let offsets = split_offsets(virtual_address, OFFSET_WIDTH, Self::TABLES_DEPTH);

        trace!(
            "mmu: acesso va={:#X} page={:#X} offset={:#X}",
            virtual_address,
            page_number,
            offsets[Self::TABLES_DEPTH]
        );

        let mut current = 0;
        for level in 0..Self::TABLES_DEPTH {
            let slot = current * Self::PAGE_SIZE + offsets[level];
            let mut next = self.memory[slot] as usize;

            if next == 0 {
                next = self.handle_miss(current, page_number, slot, level);
            }

            current = next;
        }

        current
    }

    /// Slot zerado no nível `level`: busca um frame e o instala ali.
    ///
    /// O frame atual fica protegido durante a busca; sem isso, uma tabela
    /// recém-instalada (ainda vazia) no caminho seria roubada no nível
    /// seguinte da mesma tradução.
    fn handle_miss(
        &mut self,
        current: usize,
        page_number: usize,
        slot: usize,
        level: usize,
    ) -> usize {
        self.stats.page_faults += 1;

        let choice = frame_search::find_frame::<
            OFFSET_WIDTH,
            PHYSICAL_ADDRESS_WIDTH,
            VIRTUAL_ADDRESS_WIDTH,
            S,
        >(&mut self.memory, &mut self.store, current, page_number);

        let frame = choice.frame();
        match choice {
            FrameChoice::EmptyTable(_) => {
                self.stats.tables_reclaimed += 1;
                debug!("mmu: tabela vazia reaproveitada, frame={:#X}", frame);
            }
            FrameChoice::Fresh(_) => {
                self.stats.fresh_frames += 1;
                debug!("mmu: frame novo, idx={:#X}", frame);
            }
            FrameChoice::Evicted { page, .. } => {
                self.stats.evictions += 1;
                debug!(
                    "mmu: página {:#X} evictada, frame {:#X} reusado",
                    page, frame
                );
            }
        }

        self.memory[slot] = frame as Word;

        let base = frame * Self::PAGE_SIZE;
        if level == Self::TABLES_DEPTH - 1 {
            // Folha: a página alvo volta do store (ou chega zerada).
            self.store
                .restore(page_number, &mut self.memory[base..base + Self::PAGE_SIZE]);
            self.stats.restores += 1;
        } else {
            // Tabela interna nova começa sem nenhum filho.
            self.memory[base..base + Self::PAGE_SIZE].fill(0);
        }

        frame
    }
}
