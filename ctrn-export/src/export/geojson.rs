//! Couches GeoJSON (une feature par ligne) avec schéma dynamique
//!
//! Chaque catégorie produit `<nom>.geojsonl` et, en fin d'export,
//! `<nom>.schema.json` décrivant les champs dans leur ordre de découverte.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geojson::{JsonObject, JsonValue};
use geozero::geojson::GeoJsonWriter;
use geozero::{CoordDimensions, GeozeroGeometry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ctrn::{AttributeValue, Attributes, CtrnError, FeatureGeometry, LayerInfo, OutputSink};

/// Type d'un champ de couche
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Text,
}

impl FieldType {
    /// Type inféré depuis la première valeur rencontrée
    pub fn infer(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Integer(_) => Self::Integer,
            AttributeValue::Text(_) => Self::Text,
        }
    }

    /// Convertit une valeur vers ce type (null si impossible)
    pub fn coerce(self, value: &AttributeValue) -> JsonValue {
        match (self, value) {
            (Self::Integer, AttributeValue::Integer(i)) => JsonValue::from(*i),
            (Self::Integer, AttributeValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(JsonValue::from)
                .unwrap_or(JsonValue::Null),
            (Self::Text, value) => JsonValue::from(value.to_string()),
        }
    }
}

/// Définition d'un champ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Schéma d'une couche, écrit à côté des données
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSchema {
    pub name: String,
    pub geometry_type: String,
    pub epsg: u32,
    pub fields: Vec<FieldDef>,
}

impl LayerSchema {
    pub fn new(info: &LayerInfo) -> Self {
        Self {
            name: info.name.clone(),
            geometry_type: info.geometry_type.name().to_string(),
            epsg: info.epsg(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Ajoute les champs inconnus; retourne les noms ajoutés
    pub fn extend_from(&mut self, attributes: &Attributes) -> Vec<String> {
        let mut added = Vec::new();
        for (name, value) in attributes.iter() {
            if self.field(name).is_none() {
                self.fields.push(FieldDef {
                    name: name.to_string(),
                    field_type: FieldType::infer(value),
                });
                added.push(name.to_string());
            }
        }
        added
    }

    /// Propriétés GeoJSON d'une feature, valeurs converties au type du champ
    pub fn properties(&self, attributes: &Attributes) -> JsonObject {
        let mut properties = JsonObject::new();
        for field in &self.fields {
            let value = attributes
                .get(&field.name)
                .map(|v| field.field_type.coerce(v))
                .unwrap_or(JsonValue::Null);
            properties.insert(field.name.clone(), value);
        }
        properties
    }
}

struct LayerWriter {
    writer: BufWriter<File>,
    schema: LayerSchema,
    written: usize,
}

/// Sink GeoJSON: un fichier par catégorie dans `output_dir`
pub struct GeoJsonSink {
    output_dir: PathBuf,
    overwrite: bool,
    layers: HashMap<String, LayerWriter>,
    order: Vec<String>,
}

impl GeoJsonSink {
    /// Crée le répertoire de sortie si besoin
    pub fn new(output_dir: &Path, overwrite: bool) -> Result<Self, CtrnError> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            overwrite,
            layers: HashMap::new(),
            order: Vec::new(),
        })
    }

    pub fn data_path(&self, layer: &str) -> PathBuf {
        self.output_dir.join(format!("{}.geojsonl", layer))
    }

    pub fn schema_path(&self, layer: &str) -> PathBuf {
        self.output_dir.join(format!("{}.schema.json", layer))
    }

    /// Couches ouvertes, dans l'ordre d'ouverture
    pub fn layer_names(&self) -> &[String] {
        &self.order
    }

    /// Features écrites dans une couche pendant cet export
    pub fn written(&self, layer: &str) -> usize {
        self.layers.get(layer).map_or(0, |l| l.written)
    }

    fn open_layer(&self, info: &LayerInfo) -> Result<LayerWriter, CtrnError> {
        let data_path = self.data_path(&info.name);
        let schema_path = self.schema_path(&info.name);
        let io_err = |e: std::io::Error| CtrnError::output(&info.name, e.to_string());

        if self.overwrite {
            for path in [&data_path, &schema_path] {
                if path.exists() {
                    std::fs::remove_file(path).map_err(io_err)?;
                }
            }
        }

        // Une couche existante est complétée avec son schéma
        let schema = if schema_path.exists() {
            let content = std::fs::read_to_string(&schema_path).map_err(io_err)?;
            let schema: LayerSchema = serde_json::from_str(&content)
                .map_err(|e| CtrnError::output(&info.name, format!("invalid schema: {e}")))?;
            if schema.epsg != info.epsg() || schema.geometry_type != info.geometry_type.name() {
                return Err(CtrnError::output(
                    &info.name,
                    format!(
                        "existing layer is {} EPSG:{}, cannot append {} EPSG:{}",
                        schema.geometry_type,
                        schema.epsg,
                        info.geometry_type,
                        info.epsg()
                    ),
                ));
            }
            schema
        } else {
            LayerSchema::new(info)
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&data_path)
            .map_err(io_err)?;
        debug!(
            "Opened layer {} ({} fields) at {}",
            info.name,
            schema.fields.len(),
            data_path.display()
        );

        Ok(LayerWriter {
            writer: BufWriter::new(file),
            schema,
            written: 0,
        })
    }
}

impl OutputSink for GeoJsonSink {
    fn write(
        &mut self,
        layer: &LayerInfo,
        geometry: &FeatureGeometry,
        attributes: &Attributes,
    ) -> Result<(), CtrnError> {
        layer.check_geometry(geometry)?;
        if !self.layers.contains_key(&layer.name) {
            let writer = self.open_layer(layer)?;
            self.layers.insert(layer.name.clone(), writer);
            self.order.push(layer.name.clone());
        }
        let Some(target) = self.layers.get_mut(&layer.name) else {
            return Err(CtrnError::output(&layer.name, "layer not opened"));
        };

        for field in target.schema.extend_from(attributes) {
            debug!("Layer {}: new field {}", layer.name, field);
        }

        let line = feature_line(geometry, &target.schema.properties(attributes))
            .map_err(|e| CtrnError::output(&layer.name, e))?;
        target
            .writer
            .write_all(line.as_bytes())
            .map_err(|e| CtrnError::output(&layer.name, e.to_string()))?;
        target.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CtrnError> {
        for name in &self.order {
            let Some(layer) = self.layers.get_mut(name) else {
                continue;
            };
            layer
                .writer
                .flush()
                .map_err(|e| CtrnError::output(name, e.to_string()))?;

            let json = serde_json::to_string_pretty(&layer.schema)
                .map_err(|e| CtrnError::output(name, e.to_string()))?;
            std::fs::write(self.output_dir.join(format!("{}.schema.json", name)), json)
                .map_err(|e| CtrnError::output(name, e.to_string()))?;
            debug!("Layer {}: {} features written", name, layer.written);
        }
        Ok(())
    }
}

/// Une feature GeoJSON sur une ligne
fn feature_line(geometry: &FeatureGeometry, properties: &JsonObject) -> Result<String, String> {
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::with_dims(&mut geom_buf, CoordDimensions::xyz());
    geometry
        .process_geom(&mut geom_writer)
        .map_err(|e| e.to_string())?;
    let geometry = String::from_utf8(geom_buf).map_err(|e| e.to_string())?;
    let properties = serde_json::to_string(properties).map_err(|e| e.to_string())?;

    Ok(format!(
        r#"{{"type":"Feature","geometry":{},"properties":{}}}"#,
        geometry, properties
    ) + "\n")
}
