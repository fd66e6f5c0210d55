//! Contadores de acesso da Mmu.

/// Estatísticas acumuladas desde a criação da Mmu.
///
/// Todo page fault se resolve de exatamente uma das três formas contadas
/// aqui: frame novo, tabela reaproveitada ou evicção.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MmuStats {
    pub reads: usize,
    pub writes: usize,
    pub page_faults: usize,
    pub fresh_frames: usize,
    pub tables_reclaimed: usize,
    pub evictions: usize,
    pub restores: usize,
}

impl MmuStats {
    pub fn print_stats(&self) {
        println!("estatísticas da mmu:");
        println!(
            "  acessos: {} leituras, {} escritas",
            self.reads, self.writes
        );
        println!(
            "  page faults: {} ({} frames novos, {} tabelas reaproveitadas, {} evicções)",
            self.page_faults, self.fresh_frames, self.tables_reclaimed, self.evictions
        );
        println!("  restores do backing store: {}", self.restores);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comeca_zerada() {
        let stats = MmuStats::default();

        assert_eq!(stats.reads, 0);
        assert_eq!(stats.page_faults, 0);
        assert_eq!(stats.evictions, 0);
    }
}
