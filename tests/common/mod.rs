#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory for fixture files, removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes UTF-8 `contents` under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }

    /// Writes an executable shell script standing in for an external tool.
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(name, &format!("#!/bin/sh\n{body}\n"));
        let mut permissions = fs::metadata(&path).expect("script metadata").permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).expect("make script executable");
        path
    }
}

/// A small mysqldump-style export with two tables.
pub const PLANT_DUMP: &str = "\
-- MySQL dump 10.13
--
-- Host: localhost    Database: plant
/*!40101 SET NAMES utf8mb4 */;

DROP TABLE IF EXISTS `devices`;
CREATE TABLE `devices` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `name` varchar(64) NOT NULL,
  `rated_kw` decimal(8,2) DEFAULT NULL,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;

LOCK TABLES `devices` WRITE;
INSERT INTO `devices` VALUES (1,'Pump A',7.50),(2,'Fan; north',NULL),(3,'Valve ''X''',0.25);
UNLOCK TABLES;

CREATE TABLE IF NOT EXISTS `readings` (
  `device_id` int(11) NOT NULL,
  `taken_at` datetime NOT NULL,
  `value` double DEFAULT NULL,
  KEY `idx_device` (`device_id`)
);

INSERT INTO `readings` VALUES
(1,'2024-05-06 14:30:00',3.2),
(1,'2024-05-06 14:31:00',3.4),
(2,'2024-05-06 14:30:00',NULL);
INSERT INTO `readings` VALUES (3,'2024-05-06 14:32:00',0.1);
";
