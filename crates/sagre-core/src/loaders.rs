//! File loaders for edge lists, node features and node labels.
//!
//! All three formats are whitespace-separated text, one record per
//! line; empty lines and lines starting with `#` are skipped. Malformed
//! lines fail loudly with their line number; truncating the input
//! silently would corrupt training data.

use crate::{Error, GraphBuilder, NodeEmbedding, NodeId, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn parse_node_id(token: &str, line: usize) -> Result<NodeId> {
    token
        .parse::<u64>()
        .map(NodeId::new)
        .map_err(|e| Error::Parse {
            line,
            message: format!("invalid node id {token:?}: {e}"),
        })
}

/// Populate a [`GraphBuilder`] from an edge-list file.
///
/// Each line is `src dst`. Call once before `build()`; the resulting
/// graph is immutable.
pub fn load_graph(path: impl AsRef<Path>, builder: &mut GraphBuilder) -> Result<()> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let lineno = i + 1;
        let mut parts = line.split_whitespace();
        let (Some(src), Some(dst)) = (parts.next(), parts.next()) else {
            return Err(Error::Parse {
                line: lineno,
                message: format!("expected `src dst`, got {line:?}"),
            });
        };

        builder.add_edge(parse_node_id(src, lineno)?, parse_node_id(dst, lineno)?);
    }

    Ok(())
}

/// Load real node features from disk into a [`NodeEmbedding`] store.
///
/// Each line is `id v1 v2 ... vdim`; the value count must match the
/// store dimension.
pub fn load_sparse_node_embedding(
    path: impl AsRef<Path>,
    store: &mut NodeEmbedding,
) -> Result<()> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let lineno = i + 1;
        let mut parts = line.split_whitespace();
        let id = parts.next().ok_or_else(|| Error::Parse {
            line: lineno,
            message: "missing node id".to_string(),
        })?;
        let node = parse_node_id(id, lineno)?;

        let values: Vec<f32> = parts
            .map(|t| {
                t.parse::<f32>().map_err(|e| Error::Parse {
                    line: lineno,
                    message: format!("invalid feature value {t:?}: {e}"),
                })
            })
            .collect::<Result<_>>()?;

        store.insert(node, values).map_err(|e| match e {
            Error::DimensionMismatch { expected, actual } => Error::Parse {
                line: lineno,
                message: format!("expected {expected} feature values, got {actual}"),
            },
            other => other,
        })?;
    }

    Ok(())
}

/// Load integer class labels from disk.
///
/// Each line is `id label`. Returns a map suitable for building a
/// node-classification dataset.
pub fn load_node_labels(path: impl AsRef<Path>) -> Result<HashMap<NodeId, u32>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut labels = HashMap::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let lineno = i + 1;
        let mut parts = line.split_whitespace();
        let (Some(id), Some(label)) = (parts.next(), parts.next()) else {
            return Err(Error::Parse {
                line: lineno,
                message: format!("expected `id label`, got {line:?}"),
            });
        };

        let node = parse_node_id(id, lineno)?;
        let label = label.parse::<u32>().map_err(|e| Error::Parse {
            line: lineno,
            message: format!("invalid label {label:?}: {e}"),
        })?;
        labels.insert(node, label);
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_graph() {
        let path = write_temp(
            "sagre_test_edges.txt",
            "# comment\n0 1\n1 2\n\n2 0\n",
        );

        let mut builder = GraphBuilder::new();
        load_graph(&path, &mut builder).unwrap();
        let graph = builder.build();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.has_edge(NodeId::new(2), NodeId::new(0)));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_graph_rejects_garbage() {
        let path = write_temp("sagre_test_bad_edges.txt", "0 1\nnot-an-id 2\n");

        let mut builder = GraphBuilder::new();
        let err = load_graph(&path, &mut builder).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_features() {
        let path = write_temp("sagre_test_feats.txt", "0 1.0 2.0\n1 -0.5 0.5\n");

        let mut store = NodeEmbedding::new(2);
        load_sparse_node_embedding(&path, &mut store).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(NodeId::new(0)).unwrap(), &[1.0, 2.0]);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_features_checks_dim() {
        let path = write_temp("sagre_test_feats_dim.txt", "0 1.0 2.0 3.0\n");

        let mut store = NodeEmbedding::new(2);
        let err = load_sparse_node_embedding(&path, &mut store).unwrap_err();
        assert!(err.to_string().contains("expected 2"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_labels() {
        let path = write_temp("sagre_test_labels.txt", "0 0\n1 1\n2 0\n");

        let labels = load_node_labels(&path).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[&NodeId::new(1)], 1);

        std::fs::remove_file(path).unwrap();
    }
}
