//! Store de páginas persistido num arquivo swap.
//!
//! Formato do arquivo:
//!
//! ```text
//! [n_pages: u64 LE][page_size: u64 LE][indices: n_pages x u64 LE][slots...]
//! ```
//!
//! Cada entrada de `indices` guarda `k + 1` quando a página mora no slot `k`
//! da região de dados, ou `0` quando a página nunca foi evictada (o restore
//! devolve zeros). Os slots têm `page_size` palavras e são anexados ao fim
//! do arquivo na primeira evicção de cada página.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use vm::page_store::PageStore;
use vm::Word;

const WORD_BYTES: usize = std::mem::size_of::<Word>();

#[derive(Debug)]
pub struct SwapFilePageStore<const N_PAGES: usize, const PAGE_SIZE: usize> {
    file: File,
    indices: Box<[u64; N_PAGES]>,
    used_slots: u64,
}

impl<const N_PAGES: usize, const PAGE_SIZE: usize> SwapFilePageStore<N_PAGES, PAGE_SIZE> {
    const HEADER_BYTES: usize = 2 * 8 + N_PAGES * 8;

    /// Abre (ou cria) o arquivo swap no caminho dado.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.metadata()?.len() == 0 {
            Self::write_fresh_header(&mut file)?;
        }

        let (indices, used_slots) = Self::parse_header(&mut file)?;

        Ok(SwapFilePageStore {
            file,
            indices,
            used_slots,
        })
    }

    fn write_fresh_header(file: &mut File) -> std::io::Result<()> {
        file.write_all(&(N_PAGES as u64).to_le_bytes())?;
        file.write_all(&(PAGE_SIZE as u64).to_le_bytes())?;
        file.write_all(&vec![0u8; N_PAGES * 8])?;
        Ok(())
    }

    fn parse_header(file: &mut File) -> std::io::Result<(Box<[u64; N_PAGES]>, u64)> {
        file.seek(SeekFrom::Start(0))?;

        let mut word = [0u8; 8];
        file.read_exact(&mut word)?;
        let n_pages = u64::from_le_bytes(word);
        assert_eq!(n_pages as usize, N_PAGES);

        file.read_exact(&mut word)?;
        let page_size = u64::from_le_bytes(word);
        assert_eq!(page_size as usize, PAGE_SIZE);

        let mut indices_buf = vec![0u8; N_PAGES * 8];
        file.read_exact(&mut indices_buf)?;

        let mut indices = Box::new([0u64; N_PAGES]);
        let mut used_slots = 0;

        for (page, chunk) in indices_buf.chunks(8).enumerate() {
            let index = u64::from_le_bytes(chunk.try_into().unwrap());
            indices[page] = index;
            used_slots = used_slots.max(index);
        }

        Ok((indices, used_slots))
    }

    fn slot_position(slot: u64) -> u64 {
        Self::HEADER_BYTES as u64 + slot * (PAGE_SIZE * WORD_BYTES) as u64
    }

    fn index_position(page_number: usize) -> u64 {
        (2 * 8 + page_number * 8) as u64
    }
}

impl<const N_PAGES: usize, const PAGE_SIZE: usize> PageStore
    for SwapFilePageStore<N_PAGES, PAGE_SIZE>
{
    fn restore(&mut self, page_number: usize, frame: &mut [Word]) {
        let index = self.indices[page_number];

        if index == 0 {
            // Página nunca evictada chega zerada.
            frame.fill(0);
            return;
        }

        let mut buf = vec![0u8; frame.len() * WORD_BYTES];

        self.file
            .seek(SeekFrom::Start(Self::slot_position(index - 1)))
            .unwrap();
        self.file.read_exact(&mut buf).unwrap();

        for (word, chunk) in frame.iter_mut().zip(buf.chunks(WORD_BYTES)) {
            *word = Word::from_le_bytes(chunk.try_into().unwrap());
        }
    }

    fn evict(&mut self, page_number: usize, frame: &[Word]) {
        if self.indices[page_number] == 0 {
            // Primeira evicção desta página: reserva um slot novo e registra
            // o índice no cabeçalho.
            self.used_slots += 1;
            self.indices[page_number] = self.used_slots;

            self.file
                .seek(SeekFrom::Start(Self::index_position(page_number)))
                .unwrap();
            self.file
                .write_all(&self.used_slots.to_le_bytes())
                .unwrap();
        }

        let index = self.indices[page_number];

        let mut buf = Vec::with_capacity(frame.len() * WORD_BYTES);
        for word in frame {
            buf.extend_from_slice(&word.to_le_bytes());
        }

        self.file
            .seek(SeekFrom::Start(Self::slot_position(index - 1)))
            .unwrap();
        self.file.write_all(&buf).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_swap(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("swap-{}-{}.bin", name, std::process::id()))
    }

    #[test]
    fn pagina_nunca_evictada_chega_zerada() {
        let path = temp_swap("zerada");
        let mut store = SwapFilePageStore::<8, 4>::open(&path).unwrap();

        let mut frame = [9; 4];
        store.restore(3, &mut frame);

        assert_eq!(frame, [0, 0, 0, 0]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn evict_e_restore_preservam_o_conteudo() {
        let path = temp_swap("roundtrip");
        let mut store = SwapFilePageStore::<8, 4>::open(&path).unwrap();

        store.evict(5, &[1, -2, 3, -4]);
        store.evict(2, &[7, 7, 7, 7]);
        store.evict(5, &[10, 20, 30, 40]);

        let mut frame = [0; 4];
        store.restore(5, &mut frame);
        assert_eq!(frame, [10, 20, 30, 40]);

        store.restore(2, &mut frame);
        assert_eq!(frame, [7, 7, 7, 7]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn conteudo_sobrevive_a_reabertura() {
        let path = temp_swap("reabre");

        {
            let mut store = SwapFilePageStore::<8, 4>::open(&path).unwrap();
            store.evict(1, &[11, 22, 33, 44]);
        }

        let mut store = SwapFilePageStore::<8, 4>::open(&path).unwrap();
        let mut frame = [0; 4];
        store.restore(1, &mut frame);

        assert_eq!(frame, [11, 22, 33, 44]);
        std::fs::remove_file(&path).unwrap();
    }
}
