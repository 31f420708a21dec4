//! 数据集目录下的注释存储: 标量与数组.
//!
//! 标量整体保存在 `scalars.bin` (bincode), 每个数组单独保存为一个 `.npy` 文件.
//! 所有写入都先写临时文件再重命名, 因此每个命名条目的写入是原子的.

use crate::FocusResult;
use ndarray::{ArrayD, ArrayViewD};
use ndarray_npy::{read_npy, write_npy};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const SCALARS_FILE: &str = "scalars.bin";

/// 按名称存取的持久化注释.
#[derive(Debug)]
pub struct AnnotationStore {
    root: PathBuf,
    scalars: BTreeMap<String, f64>,
}

impl AnnotationStore {
    /// 打开 (必要时创建) 位于 `root` 的注释目录.
    pub fn open<P: AsRef<Path>>(root: P) -> FocusResult<Self> {
        let root = root.as_ref().to_owned();
        fs::create_dir_all(&root)?;

        let path = root.join(SCALARS_FILE);
        let scalars: BTreeMap<String, f64> = if path.is_file() {
            bincode::deserialize_from(BufReader::new(File::open(&path)?))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { root, scalars })
    }

    /// 读取名为 `name` 的标量.
    #[inline]
    pub fn read_scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }

    /// 保存名为 `name` 的标量并立即落盘.
    pub fn store_scalar(&mut self, name: &str, value: f64) -> FocusResult<()> {
        self.scalars.insert(name.to_owned(), value);

        let tmp = self.root.join(format!("{SCALARS_FILE}.tmp"));
        {
            let mut w = BufWriter::new(File::create(&tmp)?);
            bincode::serialize_into(&mut w, &self.scalars)?;
            w.flush()?;
        }
        fs::rename(tmp, self.root.join(SCALARS_FILE))?;
        Ok(())
    }

    /// 读取名为 `name` 的数组. 不存在时返回 `Ok(None)`.
    pub fn read_array(&self, name: &str) -> FocusResult<Option<ArrayD<f32>>> {
        let path = self.array_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(read_npy(path)?))
    }

    /// 保存名为 `name` 的数组. 已存在时覆盖.
    pub fn store_array(&mut self, name: &str, array: ArrayViewD<f32>) -> FocusResult<()> {
        let path = self.array_path(name);
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        write_npy(&tmp, &array)?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn array_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.npy", escape_name(name)))
    }
}

/// 把任意名称转义为合法文件名: 保留字母数字和 `_ = , -`, 其余字节写成 `%XX`.
fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'=' | b',' | b'-') {
            out.push(b as char);
        } else {
            // 写入 `String` 不会失败.
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}
