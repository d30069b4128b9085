//! 样本源
//!
//! 从按行组织的文本流中逐行读取ADC样本（每行一个非负整数）。
//! 需要自动推断分组时采用两遍扫描：先 `count_samples` 计数，再重新打开流读取。

use crate::error::{StatsError, StatsResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 惰性、单向的样本迭代器
///
/// 跳过空白行；解析失败时产出 `MalformedInput` 后终止。
#[derive(Debug)]
pub struct SampleReader<R> {
    reader: R,
    buffer: String,
    line_number: usize,
    finished: bool,
}

impl<R: BufRead> SampleReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            line_number: 0,
            finished: false,
        }
    }

    /// 已读取的物理行数（含空白行）
    pub fn lines_read(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for SampleReader<R> {
    type Item = StatsResult<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {
                    self.line_number += 1;
                    let text = self.buffer.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Some(match text.parse::<u32>() {
                        Ok(value) => Ok(value),
                        Err(_) => {
                            self.finished = true;
                            Err(StatsError::MalformedInput {
                                line: self.line_number,
                                content: text.to_string(),
                            })
                        }
                    });
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(StatsError::IoError(err)));
                }
            }
        }
    }
}

/// 统计流中的样本数（非空白行数），与 `SampleReader` 产出的数量一致
pub fn count_samples_in<R: BufRead>(mut reader: R) -> StatsResult<usize> {
    let mut buffer = String::new();
    let mut count = 0usize;
    loop {
        buffer.clear();
        if reader.read_line(&mut buffer)? == 0 {
            break;
        }
        if !buffer.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// 预读文件统计样本总数（第一遍扫描）
pub fn count_samples(path: &Path) -> StatsResult<usize> {
    let file = File::open(path)?;
    count_samples_in(BufReader::new(file))
}

/// 打开文件并返回新的样本流（第二遍扫描）
pub fn open_samples(path: &Path) -> StatsResult<SampleReader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(SampleReader::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(text: &str) -> Vec<StatsResult<u32>> {
        SampleReader::new(Cursor::new(text.as_bytes().to_vec())).collect()
    }

    #[test]
    fn test_reads_values_in_order() {
        let values: Vec<u32> = read_all("5\n7\n9\n")
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(values, vec![5, 7, 9]);
    }

    #[test]
    fn test_skips_blank_lines_and_crlf() {
        let values: Vec<u32> = read_all("1\r\n\r\n  2  \n\n3")
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_line_stops_stream() {
        let items = read_all("1\nabc\n3\n");
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(StatsError::MalformedInput { line, content }) => {
                assert_eq!(*line, 2);
                assert_eq!(content, "abc");
            }
            other => panic!("应该是MalformedInput，实际: {other:?}"),
        }
    }

    #[test]
    fn test_negative_value_is_malformed() {
        let items = read_all("-4\n");
        assert!(matches!(
            items[0],
            Err(StatsError::MalformedInput { line: 1, .. })
        ));
    }

    #[test]
    fn test_count_matches_reader() {
        let text = "10\n\n20\n30\n\n";
        let counted = count_samples_in(Cursor::new(text.as_bytes())).unwrap();
        let streamed = read_all(text).len();
        assert_eq!(counted, 3);
        assert_eq!(counted, streamed);
    }
}
