pub mod error;

use crate::batch::error::{JobReadFailed, JobRuntimeError, JobWriteFailed};
use std::collections::HashMap;

pub type JobParameter = HashMap<String, String>;

/// 배치잡 아이템 리더 트레이트 정해진 데이터를 데이터베이스 등 특정 위치에서 조회하거나 검색한다.
/// 현재는 페이징을 지원하지 않기 때문에 잡 1회당 한번만 호출 됨으로 처리에 필요한 데이터들을 모두 로드해야한다.
pub trait Reader {
    type Item;

    fn do_read(&self, params: &JobParameter) -> Result<Vec<Self::Item>, JobReadFailed>;
}

/// `Reader`로 읽은 데이터들을 최종적으로 외부에 전달하는 트레이트
/// `do_write` 함수는 여러번 실행 될 수 있으며 각 실행은 독립적으로 처리 되어야 한다.
pub trait Writer {
    type Item;

    fn do_write(&self, items: Vec<Self::Item>) -> Result<(), JobWriteFailed<Self::Item>>;
}

const DEF_CHUNK_SIZE: usize = 500;

pub struct Job<I> {
    reader: Box<dyn Reader<Item = I>>,
    writer: Box<dyn Writer<Item = I>>,

    chunk_size: usize,
}

impl<I> Job<I> {
    pub fn set_chunk_size(mut self, size: usize) -> Job<I> {
        self.chunk_size = size;
        self
    }

    pub fn run(&self, params: &JobParameter) -> Result<(), JobRuntimeError<I>> {
        let items = self.reader.do_read(params)
            .map_err(|e| JobRuntimeError::ReadFailed(e))?;

        let chunks = chunk_with_owned(items, self.chunk_size);
        for chunk in chunks {
            self.writer.do_write(chunk)
                .map_err(|e| JobRuntimeError::WriteFailed(e))?;
        }

        Ok(())
    }
}

/// 백터를 지정된 크기의 청크들로 분활 한다.
/// 표준 라이브러리의 [`Vec::chunks`]와 달리 이 함수는 각 청크가 요소들의 소유권을 가지도록 한다.
///
/// # Panic
/// - `size`가 0일 경우
///
/// # Example
/// ```
/// use book_lending_rust::batch::chunk_with_owned;
///
/// let vec = vec![1, 2, 3, 4, 5];
/// let chunks = chunk_with_owned(vec, 2);
/// assert_eq!(chunks, vec![vec![1, 2], vec![3, 4], vec![5]]);
/// ```
pub fn chunk_with_owned<T>(mut vec: Vec<T>, size: usize) -> Vec<Vec<T>> {
    if size == 0 {
        panic!("size must be greater than 0");
    }

    let mut chunks = Vec::new();
    while vec.len() > 0 {
        let size = std::cmp::min(size, vec.len());
        let chunk = vec.drain(..size).collect::<Vec<_>>();
        chunks.push(chunk);
    }
    chunks
}

pub fn job_builder<I>() -> ReaderBuildStep<I> {
    ReaderBuildStep { reader: None }
}

pub struct ReaderBuildStep<I> {
    reader: Option<Box<dyn Reader<Item = I>>>,
}

impl<I: 'static> ReaderBuildStep<I> {
    pub fn reader(mut self, reader: Box<dyn Reader<Item = I>>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn writer(self, writer: Box<dyn Writer<Item = I>>) -> WriterBuildStep<I> {
        if let Some(reader) = self.reader {
            WriterBuildStep { reader, writer }
        } else {
            panic!("reader is not set")
        }
    }
}

pub struct WriterBuildStep<I> {
    reader: Box<dyn Reader<Item = I>>,
    writer: Box<dyn Writer<Item = I>>,
}

impl<I> WriterBuildStep<I> {
    pub fn build(self) -> Job<I> {
        Job {
            reader: self.reader,
            writer: self.writer,
            chunk_size: DEF_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct StaticReader {
        items: Vec<i32>,
    }

    impl Reader for StaticReader {
        type Item = i32;

        fn do_read(&self, _: &JobParameter) -> Result<Vec<i32>, JobReadFailed> {
            Ok(self.items.clone())
        }
    }

    struct CollectWriter {
        chunks: Rc<RefCell<Vec<Vec<i32>>>>,
    }

    impl Writer for CollectWriter {
        type Item = i32;

        fn do_write(&self, items: Vec<i32>) -> Result<(), JobWriteFailed<i32>> {
            self.chunks.borrow_mut().push(items);
            Ok(())
        }
    }

    #[test]
    fn job_writes_in_chunks() {
        let chunks = Rc::new(RefCell::new(Vec::new()));
        let job = job_builder()
            .reader(Box::new(StaticReader { items: vec![1, 2, 3] }))
            .writer(Box::new(CollectWriter { chunks: Rc::clone(&chunks) }))
            .build()
            .set_chunk_size(2);

        job.run(&JobParameter::new()).unwrap();
        assert_eq!(*chunks.borrow(), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn job_stops_on_read_failure() {
        struct FailingReader;

        impl Reader for FailingReader {
            type Item = i32;

            fn do_read(&self, _: &JobParameter) -> Result<Vec<i32>, JobReadFailed> {
                Err(JobReadFailed::EmptyData("아무 것도 없음".to_owned()))
            }
        }

        let chunks = Rc::new(RefCell::new(Vec::new()));
        let job = job_builder()
            .reader(Box::new(FailingReader))
            .writer(Box::new(CollectWriter { chunks: Rc::clone(&chunks) }))
            .build();

        assert!(matches!(
            job.run(&JobParameter::new()),
            Err(JobRuntimeError::ReadFailed(JobReadFailed::EmptyData(_)))
        ));
        assert!(chunks.borrow().is_empty());
    }
}
