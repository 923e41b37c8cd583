use super::eval::Lookup;
use crate::error::Error;
use crate::scope::Symbol;
use crate::token::{Dim, Field, Initializer, Variable};

/// Size of the builtin scalar types.
pub fn builtin(ty: &str) -> Option<usize> {
    match ty {
        "byte" | "char" | "bool" => Some(1),
        "word" | "pointer" => Some(2),
        "dword" => Some(4),
        _ => None,
    }
}

impl Lookup<'_> {
    /// Byte size of `ty`. Enums are stored in a byte.
    pub fn type_size(&self, ty: &str) -> Result<Option<usize>, Error> {
        if let Some(size) = builtin(ty) {
            return Ok(Some(size));
        }
        match self.scopes.lookup_entry(ty, Some(self.ns)) {
            Some((ns, Symbol::Struct(def))) => {
                let trail = self.enter(ns.qualify(&def.name))?;
                let inner = self.within(&ns, &trail);
                let mut total = 0;
                for field in &def.fields {
                    match inner.field_size(field)? {
                        Some(size) => total += size,
                        None => return Ok(None),
                    }
                }
                Ok(Some(total))
            }
            Some((ns, Symbol::Typedef(def))) => {
                let trail = self.enter(ns.qualify(&def.name))?;
                let inner = self.within(&ns, &trail);
                let size = inner.type_size(&def.ty)?;
                let count = inner.count(&def.dim, None)?;
                Ok(size.zip(count).map(|(size, count)| size * count))
            }
            Some((_, Symbol::Enum(_))) => Ok(Some(1)),
            _ => Err(Error::UnknownType(self.pos.clone(), ty.to_string())),
        }
    }

    /// Number of elements declared by `dim`. An open array takes its length
    /// from the initializer.
    pub fn count(&self, dim: &Dim, init: Option<&Initializer>) -> Result<Option<usize>, Error> {
        match dim {
            Dim::Scalar => Ok(Some(1)),
            Dim::Array(Some(len)) => Ok(self.constant(len)?.map(|n| n.max(0) as usize)),
            Dim::Array(None) => match init {
                Some(init) => Ok(Some(init.count())),
                None => Err(Error::NotAConstant(self.pos.clone(), "[]".to_string())),
            },
        }
    }

    pub fn variable_size(&self, var: &Variable) -> Result<Option<usize>, Error> {
        let size = self.type_size(&var.ty)?;
        let count = self.count(&var.dim, var.init.as_ref())?;
        Ok(size.zip(count).map(|(size, count)| size * count))
    }

    fn field_size(&self, field: &Field) -> Result<Option<usize>, Error> {
        let size = self.type_size(&field.ty)?;
        let count = self.count(&field.dim, None)?;
        Ok(size.zip(count).map(|(size, count)| size * count))
    }

    /// Offset of the dotted member `path` inside a value of type `ty`.
    pub fn field_offset(&self, ty: &str, path: &str) -> Result<Option<usize>, Error> {
        let (name, rest) = match path.split_once('.') {
            Some((name, rest)) => (name, Some(rest)),
            None => (path, None),
        };
        let no_member = || Error::NoSuchMember(self.pos.clone(), ty.to_string(), path.to_string());
        let (ns, def) = match self.scopes.lookup_entry(ty, Some(self.ns)) {
            Some((ns, Symbol::Struct(def))) => (ns, def),
            Some((ns, Symbol::Typedef(def))) if def.dim == Dim::Scalar => {
                let trail = self.enter(ns.qualify(&def.name))?;
                return self.within(&ns, &trail).field_offset(&def.ty, path);
            }
            _ => return Err(no_member()),
        };
        let inner = self.at(&ns);
        let mut offset = 0;
        for field in &def.fields {
            if field.name == name {
                return match rest {
                    Some(rest) => Ok(inner.field_offset(&field.ty, rest)?.map(|o| offset + o)),
                    None => Ok(Some(offset)),
                };
            }
            match inner.field_size(field)? {
                Some(size) => offset += size,
                None => return Ok(None),
            }
        }
        Err(no_member())
    }
}
